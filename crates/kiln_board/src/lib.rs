//! Board catalog for Kiln SoC targets.
//!
//! This crate provides the [`Board`] trait that describes one physical FPGA
//! board: its device part, primary oscillator, pin table, vendor build
//! commands, and programming setup. A built-in catalog covers the boards
//! Kiln ships with, and [`profile`] loads additional boards from TOML.
//!
//! # Usage
//!
//! Use [`load_board`] to look up a built-in board by name:
//!
//! ```
//! use kiln_board::load_board;
//!
//! let board = load_board("bochen_kintex7_base").unwrap();
//! assert_eq!(board.device(), "xc7k325t-ffg676-2");
//! assert!(board.resources().contains("clk50", 0));
//! ```

#![warn(missing_docs)]

pub mod boards;
pub mod device;
pub mod error;
pub mod profile;
pub mod xilinx;

pub use boards::{builtin_boards, BochenKintex7Base};
pub use device::{DefaultClock, DeviceDescriptor, ProgrammerInfo, ToolchainCommands};
pub use error::BoardError;
pub use profile::{load_board_profile, load_board_profile_from_str, ProfileBoard};
pub use xilinx::XilinxFamily;

use kiln_clock::SynthesizerLimits;
use kiln_resource::ResourceRegistry;
use std::sync::Arc;

/// A physical FPGA board that targets can be composed for.
///
/// Implementations own an immutable pin catalog that is shared (via `Arc`)
/// with every target assembled for the board.
pub trait Board: std::fmt::Debug + Send + Sync {
    /// Returns the catalog name (e.g. `bochen_kintex7_base`).
    fn name(&self) -> &str;

    /// Returns the human-readable board title.
    fn title(&self) -> &str;

    /// Returns the device and programming metadata.
    fn descriptor(&self) -> &DeviceDescriptor;

    /// Returns the shared pin catalog.
    fn resources(&self) -> Arc<ResourceRegistry>;

    /// Returns the full device part number.
    fn device(&self) -> &str {
        &self.descriptor().part
    }

    /// Returns the primary oscillator.
    fn default_clock(&self) -> &DefaultClock {
        &self.descriptor().default_clock
    }

    /// Returns the limits clock synthesizers are solved against.
    fn synthesizer_limits(&self) -> SynthesizerLimits {
        let descriptor = self.descriptor();
        descriptor.family.synthesizer_limits(descriptor.speedgrade)
    }

    /// Returns the default identification string for SoCs built on this board.
    fn default_ident(&self) -> String {
        format!("Kiln SoC on {}", self.title())
    }
}

/// Loads a built-in board by catalog name.
///
/// Names are matched case-insensitively and `-` is accepted in place of `_`.
///
/// # Errors
///
/// Returns [`BoardError::UnknownBoard`] if no built-in board has that name.
pub fn load_board(name: &str) -> Result<Box<dyn Board>, BoardError> {
    let normalized = name.to_ascii_lowercase().replace('-', "_");
    match normalized.as_str() {
        "bochen_kintex7_base" | "bochen_k7_base" => Ok(Box::new(BochenKintex7Base::new()?)),
        _ => Err(BoardError::UnknownBoard {
            name: name.to_string(),
            available: builtin_boards().join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_builtin_board() {
        let board = load_board("bochen_kintex7_base").unwrap();
        assert_eq!(board.name(), "bochen_kintex7_base");
        assert_eq!(board.default_clock().name, "clk50");
        assert_eq!(board.default_ident(), "Kiln SoC on Bochen Kintex7 Base");
    }

    #[test]
    fn load_board_aliases() {
        assert!(load_board("Bochen-Kintex7-Base").is_ok());
        assert!(load_board("bochen_k7_base").is_ok());
    }

    #[test]
    fn load_unknown_board() {
        let err = load_board("arty_a7").unwrap_err();
        assert!(err.to_string().contains("unknown board 'arty_a7'"));
        assert!(err.to_string().contains("bochen_kintex7_base"));
    }

    #[test]
    fn kintex7_limits_follow_speedgrade() {
        let board = load_board("bochen_kintex7_base").unwrap();
        assert_eq!(board.synthesizer_limits(), SynthesizerLimits::s7_mmcm(-2));
    }
}
