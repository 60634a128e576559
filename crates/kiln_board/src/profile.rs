//! TOML board profiles.
//!
//! A profile describes a board that is not built in:
//!
//! ```toml
//! [board]
//! name = "arty_a7"
//! title = "Digilent Arty A7"
//! part = "xc7a35ticsg324-1L"
//! default_clock = "clk100"
//! default_clock_freq = 100e6
//!
//! [[io]]
//! name = "clk100"
//! pins = "E3"
//! attrs = { IOSTANDARD = "LVCMOS33" }
//!
//! [[io]]
//! name = "serial"
//! attrs = { IOSTANDARD = "LVCMOS33" }
//! subsignals = [
//!     { subsignal = "tx", pins = "D10" },
//!     { subsignal = "rx", pins = "A9" },
//! ]
//! ```

use crate::device::{DefaultClock, DeviceDescriptor, ProgrammerInfo, ToolchainCommands};
use crate::error::BoardError;
use crate::Board;
use kiln_common::Frequency;
use kiln_resource::{AttrKey, Attrs, PinGroup, ResourceDescriptor, ResourceRegistry};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProfileFile {
    board: BoardSection,
    #[serde(default)]
    io: Vec<IoEntry>,
}

#[derive(Debug, Deserialize)]
struct BoardSection {
    name: String,
    #[serde(default)]
    title: Option<String>,
    part: String,
    default_clock: String,
    default_clock_freq: Frequency,
    #[serde(default)]
    bitstream_commands: Vec<String>,
    #[serde(default)]
    additional_commands: Vec<String>,
    #[serde(default)]
    platform_commands: Vec<String>,
    #[serde(default)]
    programmer: ProgrammerInfo,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PinSpec {
    One(String),
    Many(Vec<String>),
}

impl PinSpec {
    fn joined(&self) -> String {
        match self {
            PinSpec::One(pins) => pins.clone(),
            PinSpec::Many(pins) => pins.join(" "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IoEntry {
    name: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    pins: Option<PinSpec>,
    #[serde(default)]
    subsignals: Vec<PinGroup>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    misc: Vec<String>,
}

impl IoEntry {
    fn into_descriptor(self) -> ResourceDescriptor {
        let mut desc = ResourceDescriptor::new(&self.name, self.index);
        if let Some(pins) = &self.pins {
            desc = desc.pins(&pins.joined());
        }
        for group in self.subsignals {
            desc = desc.subsignal(group);
        }
        for (key, value) in self.attrs {
            desc = desc.attr(key, &value);
        }
        for text in &self.misc {
            let (key, value) = AttrKey::parse_misc(text);
            desc = desc.attr(key, &value);
        }
        desc
    }
}

/// A board loaded from a TOML profile.
#[derive(Debug)]
pub struct ProfileBoard {
    name: String,
    title: String,
    descriptor: DeviceDescriptor,
    resources: Arc<ResourceRegistry>,
}

impl Board for ProfileBoard {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    fn resources(&self) -> Arc<ResourceRegistry> {
        Arc::clone(&self.resources)
    }
}

/// Loads a board profile from a TOML file.
pub fn load_board_profile(path: &Path) -> Result<ProfileBoard, BoardError> {
    let content = std::fs::read_to_string(path).map_err(|source| BoardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_board_profile_from_str(&content)
}

/// Parses a board profile from TOML text.
///
/// The pin table must be consistent and must contain the default clock.
pub fn load_board_profile_from_str(content: &str) -> Result<ProfileBoard, BoardError> {
    let file: ProfileFile =
        toml::from_str(content).map_err(|e| BoardError::Parse(e.to_string()))?;
    let section = file.board;

    let resources =
        ResourceRegistry::from_descriptors(file.io.into_iter().map(IoEntry::into_descriptor))?;
    if !resources.contains(&section.default_clock, 0) {
        return Err(BoardError::MissingDefaultClock(section.default_clock));
    }

    let mut descriptor = DeviceDescriptor::new(
        &section.part,
        DefaultClock {
            name: section.default_clock,
            frequency: section.default_clock_freq,
        },
    )?;
    descriptor.toolchain = ToolchainCommands {
        bitstream: section.bitstream_commands,
        additional: section.additional_commands,
        platform: section.platform_commands,
    };
    descriptor.programmer = section.programmer;

    debug!(
        board = %section.name,
        part = %descriptor.part,
        resources = resources.len(),
        "loaded board profile"
    );
    Ok(ProfileBoard {
        title: section.title.unwrap_or_else(|| section.name.clone()),
        name: section.name,
        descriptor,
        resources: Arc::new(resources),
    })
}
