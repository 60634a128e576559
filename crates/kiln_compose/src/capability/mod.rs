//! Subsystem capability providers.
//!
//! A [`Capability`] is one optional subsystem (DRAM controller, Ethernet PHY,
//! ...) described only by what it needs from the target: derived clock
//! domains and physical resources. The composer satisfies those needs and
//! hands the bound resources back to [`Capability::instantiate`], which
//! returns an opaque [`SubsystemHandle`].

pub mod io;
pub mod memory;
pub mod network;
pub mod storage;
pub mod video;

use kiln_clock::Purpose;
use kiln_common::Frequency;
use kiln_resource::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use io::{LedChaser, Uart};
pub use memory::Ddr3Sdram;
pub use network::RgmiiEthernet;
pub use storage::{SdCard, SpiFlash};
pub use video::HdmiVideo;

/// Relative tolerance given to every derived domain a capability asks for.
pub const DEFAULT_MARGIN: f64 = 1e-2;

/// The kind of subsystem a binding represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    /// DDR3 SDRAM controller and PHY.
    Sdram,
    /// Quad SPI flash.
    SpiFlash,
    /// SD card controller.
    #[serde(rename = "sdcard")]
    SdCard,
    /// Ethernet MAC.
    Ethernet,
    /// Etherbone bridge without a CPU MAC.
    Etherbone,
    /// HDMI text terminal.
    VideoTerminal,
    /// HDMI framebuffer.
    VideoFramebuffer,
    /// LED chaser.
    LedChaser,
    /// Serial console.
    Uart,
}

impl SubsystemKind {
    /// Returns the snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemKind::Sdram => "sdram",
            SubsystemKind::SpiFlash => "spi_flash",
            SubsystemKind::SdCard => "sdcard",
            SubsystemKind::Ethernet => "ethernet",
            SubsystemKind::Etherbone => "etherbone",
            SubsystemKind::VideoTerminal => "video_terminal",
            SubsystemKind::VideoFramebuffer => "video_framebuffer",
            SubsystemKind::LedChaser => "led_chaser",
            SubsystemKind::Uart => "uart",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which synthesizer tree a derived domain belongs to.
///
/// Each tree has its own synthesizer and therefore its own reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTree {
    /// The CRG synthesizer that also produces `sys`.
    System,
    /// A dedicated synthesizer for video clocks.
    Video,
}

/// A derived clock domain a capability needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRequest {
    /// Name used if the domain has to be created.
    pub name: String,
    /// Requested frequency.
    pub frequency: Frequency,
    /// Role, used to share the domain with other capabilities.
    pub purpose: Purpose,
    /// Synthesizer tree to create the domain on.
    pub tree: ClockTree,
}

impl DomainRequest {
    /// A request on the system tree.
    pub fn system(name: &str, frequency: Frequency, purpose: Purpose) -> Self {
        Self {
            name: name.to_string(),
            frequency,
            purpose,
            tree: ClockTree::System,
        }
    }

    /// A request on the video tree.
    pub fn video(name: &str, frequency: Frequency, purpose: Purpose) -> Self {
        Self {
            tree: ClockTree::Video,
            ..Self::system(name, frequency, purpose)
        }
    }
}

/// A physical resource a capability needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    /// One instance, bound strictly.
    One {
        /// Resource name.
        name: String,
        /// Instance index.
        index: u32,
    },
    /// Every instance registered under a name.
    All {
        /// Resource name.
        name: String,
    },
}

impl ResourceRequest {
    /// Requests `(name, index)`.
    pub fn one(name: &str, index: u32) -> Self {
        ResourceRequest::One {
            name: name.to_string(),
            index,
        }
    }

    /// Requests every instance of `name`.
    pub fn all(name: &str) -> Self {
        ResourceRequest::All {
            name: name.to_string(),
        }
    }
}

/// Opaque description of an instantiated subsystem.
///
/// `core` names the gateware core; `params` are its configuration values as
/// strings, for the build collaborator and for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemHandle {
    /// Gateware core name.
    pub core: String,
    /// Core parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl SubsystemHandle {
    /// Creates a handle with no parameters.
    pub fn new(core: &str) -> Self {
        Self {
            core: core.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}

/// An optional subsystem provider.
pub trait Capability: fmt::Debug {
    /// Returns the subsystem kind recorded in the binding.
    fn kind(&self) -> SubsystemKind;

    /// Returns the derived clock domains the subsystem needs.
    ///
    /// Default requests none; the subsystem runs on `sys`.
    fn domain_requests(&self, _sys_clk_freq: Frequency) -> Vec<DomainRequest> {
        Vec::new()
    }

    /// Returns the physical resources the subsystem needs, in request order.
    fn resource_requests(&self) -> Vec<ResourceRequest>;

    /// Builds the subsystem handle from the bound resources.
    fn instantiate(&self, resources: &[&ResourceDescriptor]) -> SubsystemHandle;
}
