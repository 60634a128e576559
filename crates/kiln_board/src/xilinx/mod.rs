//! Xilinx (AMD) 7-series device families.

use crate::error::BoardError;
use kiln_clock::SynthesizerLimits;
use serde::{Deserialize, Serialize};

/// Xilinx (AMD) 7-series device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XilinxFamily {
    /// Artix-7.
    Artix7,
    /// Kintex-7.
    Kintex7,
    /// Spartan-7.
    Spartan7,
    /// Zynq-7000.
    Zynq7000,
}

impl XilinxFamily {
    /// Returns the human-readable name of this family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Artix7 => "Artix-7",
            Self::Kintex7 => "Kintex-7",
            Self::Spartan7 => "Spartan-7",
            Self::Zynq7000 => "Zynq-7000",
        }
    }

    /// Returns the clock synthesizer limits for a speed grade.
    ///
    /// Every 7-series family uses the same `MMCME2_ADV` primitive.
    pub fn synthesizer_limits(&self, speedgrade: i8) -> SynthesizerLimits {
        SynthesizerLimits::s7_mmcm(speedgrade)
    }
}

/// Splits a part number such as `xc7k325t-ffg676-2` into family and speed grade.
///
/// A missing or unparsable speed grade suffix defaults to `-1`, the slowest grade.
pub fn parse_part(part: &str) -> Result<(XilinxFamily, i8), BoardError> {
    let lower = part.to_ascii_lowercase();
    let family = if lower.starts_with("xc7a") {
        XilinxFamily::Artix7
    } else if lower.starts_with("xc7k") {
        XilinxFamily::Kintex7
    } else if lower.starts_with("xc7s") {
        XilinxFamily::Spartan7
    } else if lower.starts_with("xc7z") {
        XilinxFamily::Zynq7000
    } else {
        return Err(BoardError::UnsupportedPart(part.to_string()));
    };

    let speedgrade = lower
        .rsplit_once('-')
        .and_then(|(_, grade)| {
            grade
                .trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .parse::<i8>()
                .ok()
        })
        .map_or(-1, |grade| -grade);
    Ok((family, speedgrade))
}
