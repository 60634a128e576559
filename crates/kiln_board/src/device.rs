//! Device metadata carried from the board into every target assembly.

use crate::xilinx::XilinxFamily;
use kiln_common::Frequency;
use serde::{Deserialize, Serialize};

/// The board's primary oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultClock {
    /// Resource name of the oscillator input (e.g. `clk50`).
    pub name: String,
    /// Oscillator frequency.
    pub frequency: Frequency,
}

/// Extra Tcl lines for the vendor toolchain.
///
/// `{build_name}` in any line is replaced with the build name when rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolchainCommands {
    /// Properties applied before `write_bitstream`.
    #[serde(default)]
    pub bitstream: Vec<String>,
    /// Commands run after the bitstream is written.
    #[serde(default)]
    pub additional: Vec<String>,
    /// Raw lines appended to the constraint file.
    #[serde(default)]
    pub platform: Vec<String>,
}

/// How the board is programmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgrammerInfo {
    /// OpenOCD interface/target config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openocd_config: Option<String>,
    /// JTAG-to-SPI proxy bitstream used by OpenOCD for flashing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openocd_proxy: Option<String>,
    /// Configuration flash part name for the Vivado hardware manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_part: Option<String>,
}

/// Everything downstream tools need to know about the target device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Full part number (e.g. `xc7k325t-ffg676-2`).
    pub part: String,
    /// Device family parsed from the part number.
    pub family: XilinxFamily,
    /// Speed grade parsed from the part number (e.g. `-2`).
    pub speedgrade: i8,
    /// Primary oscillator.
    pub default_clock: DefaultClock,
    /// Vendor toolchain hooks.
    #[serde(default)]
    pub toolchain: ToolchainCommands,
    /// Programming setup.
    #[serde(default)]
    pub programmer: ProgrammerInfo,
}

impl DeviceDescriptor {
    /// Creates a descriptor, deriving family and speed grade from `part`.
    pub fn new(
        part: &str,
        default_clock: DefaultClock,
    ) -> Result<Self, crate::error::BoardError> {
        let (family, speedgrade) = crate::xilinx::parse_part(part)?;
        Ok(Self {
            part: part.to_string(),
            family,
            speedgrade,
            default_clock,
            toolchain: ToolchainCommands::default(),
            programmer: ProgrammerInfo::default(),
        })
    }
}
