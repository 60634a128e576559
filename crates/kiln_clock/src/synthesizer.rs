//! Frequency synthesizer instances and the divider solver.
//!
//! A synthesizer multiplies its input up to a VCO frequency
//! (`f_in * mult / divclk`) and divides the VCO down per output. The solver
//! walks divider settings from the highest VCO down and accepts the first
//! one where every output lands within its margin, which is how the 7-series
//! MMCM/PLL wizards pick settings.
//!
//! Whole-number settings are searched first. An MMCM also has a fractional
//! feedback multiplier and a fractional `CLKOUT0` divider (1/8 steps); those
//! are only tried once no whole-number setting fits, so targets that solve
//! exactly keep their plain divider settings.

use crate::error::ClockError;
use crate::ids::SynthesizerId;
use kiln_common::Frequency;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A synthesizer instance as recorded while the graph is being built.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Synthesizer {
    /// Allocation-order id.
    pub id: SynthesizerId,
    /// Instance name used in build scripts (e.g. `crg_pll`).
    pub name: String,
    /// Input domain, fixed by the first derived output.
    pub upstream: Option<String>,
    /// Output domain names in creation order.
    pub outputs: Vec<String>,
}

/// Device limits of a 7-series style MMCM or PLL primitive.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MmcmLimits {
    /// Primitive name (e.g. `MMCME2_ADV`).
    pub primitive: String,
    /// Accepted input frequency range in Hz.
    pub clkin_range: (f64, f64),
    /// VCO operating range in Hz.
    pub vco_range: (f64, f64),
    /// Fraction of the VCO range kept clear at each end.
    pub vco_margin: f64,
    /// Inclusive input divider range.
    pub divclk_divide: (u32, u32),
    /// Inclusive feedback multiplier range.
    pub clkfbout_mult: (u32, u32),
    /// Inclusive output divider range.
    pub clkout_divide: (u32, u32),
    /// Step of `CLKFBOUT_MULT_F` and `CLKOUT0_DIVIDE_F`; `None` without fractional support.
    #[serde(default)]
    pub fractional_step: Option<f64>,
    /// Number of clock outputs on the primitive.
    pub max_outputs: usize,
}

/// The synthesizer model a graph is finalized against.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum SynthesizerLimits {
    /// Every requested output is produced exactly; nothing is solved.
    Ideal,
    /// A divider-constrained MMCM/PLL.
    Mmcm(MmcmLimits),
}

impl SynthesizerLimits {
    /// Kintex/Artix-7 `MMCME2_ADV` limits for the given speed grade (-1, -2, -3).
    pub fn s7_mmcm(speedgrade: i8) -> Self {
        let (clkin_max, vco_max) = match speedgrade {
            -1 => (800e6, 1200e6),
            -3 => (1066e6, 1600e6),
            _ => (933e6, 1440e6),
        };
        SynthesizerLimits::Mmcm(MmcmLimits {
            primitive: "MMCME2_ADV".to_string(),
            clkin_range: (10e6, clkin_max),
            vco_range: (600e6, vco_max),
            vco_margin: 0.0,
            divclk_divide: (1, 106),
            clkfbout_mult: (2, 64),
            clkout_divide: (1, 128),
            fractional_step: Some(0.125),
            max_outputs: 7,
        })
    }

    /// Kintex/Artix-7 `PLLE2_ADV` limits for the given speed grade (-1, -2, -3).
    pub fn s7_pll(speedgrade: i8) -> Self {
        let (clkin_max, vco_max) = match speedgrade {
            -1 => (800e6, 1600e6),
            -3 => (1066e6, 2133e6),
            _ => (933e6, 1866e6),
        };
        SynthesizerLimits::Mmcm(MmcmLimits {
            primitive: "PLLE2_ADV".to_string(),
            clkin_range: (19e6, clkin_max),
            vco_range: (800e6, vco_max),
            vco_margin: 0.0,
            divclk_divide: (1, 56),
            clkfbout_mult: (2, 64),
            clkout_divide: (1, 128),
            fractional_step: None,
            max_outputs: 6,
        })
    }

    /// Returns the primitive name emitted into build scripts.
    pub fn primitive(&self) -> &str {
        match self {
            SynthesizerLimits::Ideal => "IDEAL",
            SynthesizerLimits::Mmcm(limits) => &limits.primitive,
        }
    }
}

/// One solved output of a synthesizer.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// The domain driven by this output.
    pub domain: String,
    /// Output divider from the VCO; fractional only on output 0.
    pub divide: f64,
    /// Frequency actually produced.
    pub achieved: Frequency,
}

/// Divider settings chosen for a synthesizer.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// VCO frequency; `None` under [`SynthesizerLimits::Ideal`].
    pub vco: Option<Frequency>,
    /// Input divider.
    pub divclk_divide: u32,
    /// Feedback multiplier, possibly fractional on an MMCM.
    pub clkfbout_mult: f64,
    /// Outputs in creation order.
    pub outputs: Vec<OutputConfig>,
}

/// A synthesizer after finalization.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SolvedSynthesizer {
    /// Allocation-order id.
    pub id: SynthesizerId,
    /// Instance name.
    pub name: String,
    /// Input domain.
    pub upstream: String,
    /// Primitive the settings target.
    pub primitive: String,
    /// Chosen settings.
    pub config: SynthesizerConfig,
}

/// A requested output: domain name, target frequency, relative margin.
pub(crate) struct OutputRequest<'a> {
    pub domain: &'a str,
    pub frequency: Frequency,
    pub margin: f64,
}

/// Finds divider settings for `outputs` driven from `input`.
pub(crate) fn solve(
    limits: &SynthesizerLimits,
    name: &str,
    input: Frequency,
    outputs: &[OutputRequest<'_>],
) -> Result<SynthesizerConfig, ClockError> {
    let unsolvable = |reason: String| ClockError::UnsolvableSynthesizer {
        name: name.to_string(),
        reason,
    };

    let mmcm = match limits {
        SynthesizerLimits::Ideal => {
            return Ok(SynthesizerConfig {
                vco: None,
                divclk_divide: 1,
                clkfbout_mult: 1.0,
                outputs: outputs
                    .iter()
                    .map(|o| OutputConfig {
                        domain: o.domain.to_string(),
                        divide: 1.0,
                        achieved: o.frequency,
                    })
                    .collect(),
            });
        }
        SynthesizerLimits::Mmcm(mmcm) => mmcm,
    };

    if outputs.len() > mmcm.max_outputs {
        return Err(unsolvable(format!(
            "{} outputs requested but {} has {}",
            outputs.len(),
            mmcm.primitive,
            mmcm.max_outputs
        )));
    }
    let (clkin_min, clkin_max) = mmcm.clkin_range;
    if input.hz() < clkin_min || input.hz() > clkin_max {
        return Err(unsolvable(format!(
            "input {input} outside {}..{}",
            Frequency::new(clkin_min),
            Frequency::new(clkin_max)
        )));
    }

    let (vco_min, vco_max) = mmcm.vco_range;
    let vco_low = vco_min * (1.0 + mmcm.vco_margin);
    let vco_high = vco_max * (1.0 - mmcm.vco_margin);

    let mut passes = vec![Settings::new(mmcm, None)];
    if let Some(step) = mmcm.fractional_step {
        passes.push(Settings::new(mmcm, Some(step)));
    }
    for (pass, settings) in passes.iter().enumerate() {
        if pass > 0 {
            debug!(synthesizer = name, "no whole-number setting, trying fractional");
        }
        for divclk in mmcm.divclk_divide.0..=mmcm.divclk_divide.1 {
            for &mult in settings.mults.iter().rev() {
                let vco = input.hz() * mult / f64::from(divclk);
                if vco < vco_low || vco > vco_high {
                    continue;
                }
                if let Some(solved) = settings.fit(Frequency::new(vco), outputs) {
                    return Ok(SynthesizerConfig {
                        vco: Some(Frequency::new(vco)),
                        divclk_divide: divclk,
                        clkfbout_mult: mult,
                        outputs: solved,
                    });
                }
            }
        }
    }

    let wanted: Vec<String> = outputs
        .iter()
        .map(|o| format!("{}={}", o.domain, o.frequency))
        .collect();
    Err(unsolvable(format!(
        "cannot produce {} from {input}",
        wanted.join(", ")
    )))
}

/// Candidate multiplier and divider values for one search pass.
struct Settings {
    mults: Vec<f64>,
    first_divides: Vec<f64>,
    divides: Vec<f64>,
}

impl Settings {
    fn new(mmcm: &MmcmLimits, fractional: Option<f64>) -> Self {
        let divides = steps(mmcm.clkout_divide, None);
        Self {
            mults: steps(mmcm.clkfbout_mult, fractional),
            first_divides: steps(mmcm.clkout_divide, fractional),
            divides,
        }
    }

    fn fit(&self, vco: Frequency, outputs: &[OutputRequest<'_>]) -> Option<Vec<OutputConfig>> {
        outputs
            .iter()
            .enumerate()
            .map(|(index, out)| {
                let candidates = if index == 0 {
                    &self.first_divides
                } else {
                    &self.divides
                };
                candidates.iter().find_map(|&divide| {
                    let achieved = Frequency::new(vco.hz() / divide);
                    achieved.within(out.frequency, out.margin).then(|| OutputConfig {
                        domain: out.domain.to_string(),
                        divide,
                        achieved,
                    })
                })
            })
            .collect()
    }
}

/// Values from `range.0` to `range.1` inclusive, in `step` increments or whole numbers.
fn steps(range: (u32, u32), step: Option<f64>) -> Vec<f64> {
    match step {
        None => (range.0..=range.1).map(f64::from).collect(),
        Some(step) => {
            let low = f64::from(range.0);
            let count = ((f64::from(range.1) - low) / step).round() as u32;
            (0..=count).map(|i| low + f64::from(i) * step).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(domain: &str, mhz: f64, margin: f64) -> OutputRequest<'_> {
        OutputRequest {
            domain,
            frequency: Frequency::from_mhz(mhz),
            margin,
        }
    }

    #[test]
    fn crg_with_sdram_from_50mhz() {
        let config = solve(
            &SynthesizerLimits::s7_mmcm(-2),
            "crg_pll",
            Frequency::from_mhz(50.0),
            &[
                req("sys", 100.0, 0.0),
                req("sys4x", 400.0, 0.0),
                req("idelay", 200.0, 0.0),
            ],
        )
        .unwrap();
        assert_eq!(config.vco, Some(Frequency::from_mhz(1200.0)));
        assert_eq!(config.divclk_divide, 1);
        assert_eq!(config.clkfbout_mult, 24.0);
        let divides: Vec<f64> = config.outputs.iter().map(|o| o.divide).collect();
        assert_eq!(divides, vec![12.0, 3.0, 6.0]);
    }

    #[test]
    fn highest_vco_preferred() {
        let config = solve(
            &SynthesizerLimits::s7_mmcm(-2),
            "crg_pll",
            Frequency::from_mhz(50.0),
            &[req("sys", 100.0, 0.0)],
        )
        .unwrap();
        // 50 MHz * 28 = 1400 MHz is the highest VCO inside 600..1440 MHz.
        assert_eq!(config.clkfbout_mult, 28.0);
        assert_eq!(config.outputs[0].divide, 14.0);
    }

    #[test]
    fn margin_allows_approximation() {
        let limits = SynthesizerLimits::s7_mmcm(-2);
        let loose = solve(
            &limits,
            "video_pll",
            Frequency::from_mhz(50.0),
            &[req("hdmi", 74.25, 1e-2), req("hdmi5x", 371.25, 1e-2)],
        )
        .unwrap();
        for out in &loose.outputs {
            let target = if out.domain == "hdmi" { 74.25 } else { 371.25 };
            assert!(out.achieved.within(Frequency::from_mhz(target), 1e-2));
        }
    }

    #[test]
    fn fractional_first_output_when_whole_numbers_miss() {
        let config = solve(
            &SynthesizerLimits::s7_mmcm(-2),
            "crg_pll",
            Frequency::from_mhz(50.0),
            &[req("sys", 90.0, 1e-2), req("idelay", 200.0, 1e-2)],
        )
        .unwrap();
        let sys = &config.outputs[0];
        assert!(sys.achieved.within(Frequency::from_mhz(90.0), 1e-2));
        assert!(config.clkfbout_mult.fract() != 0.0 || sys.divide.fract() != 0.0);
        assert_eq!((sys.divide * 8.0).fract(), 0.0);
        assert_eq!((config.clkfbout_mult * 8.0).fract(), 0.0);
        let idelay = &config.outputs[1];
        assert_eq!(idelay.divide.fract(), 0.0);
        assert!(idelay.achieved.within(Frequency::from_mhz(200.0), 1e-2));
    }

    #[test]
    fn fractional_steps() {
        assert_eq!(steps((2, 3), Some(0.125)).len(), 9);
        assert_eq!(steps((2, 3), Some(0.125))[1], 2.125);
        assert_eq!(steps((1, 4), None), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn too_many_outputs() {
        let outputs: Vec<OutputRequest<'_>> =
            (0..8).map(|_| req("o", 100.0, 0.0)).collect();
        let err = solve(
            &SynthesizerLimits::s7_mmcm(-2),
            "big",
            Frequency::from_mhz(50.0),
            &outputs,
        )
        .unwrap_err();
        assert!(matches!(err, ClockError::UnsolvableSynthesizer { ref name, .. } if name == "big"));
    }

    #[test]
    fn input_out_of_range() {
        let err = solve(
            &SynthesizerLimits::s7_pll(-2),
            "pll",
            Frequency::from_mhz(12.0),
            &[req("sys", 100.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, ClockError::UnsolvableSynthesizer { .. }));
    }

    #[test]
    fn unreachable_output() {
        // 700.5 MHz would need a multiplier/divider ratio outside the MMCM ranges.
        let err = solve(
            &SynthesizerLimits::s7_mmcm(-2),
            "crg_pll",
            Frequency::from_mhz(50.0),
            &[req("fast", 700.5, 0.0)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("fast=700.5MHz"));
    }

    #[test]
    fn ideal_passes_through() {
        let config = solve(
            &SynthesizerLimits::Ideal,
            "any",
            Frequency::from_mhz(1.0),
            &[req("weird", 123.456, 0.0)],
        )
        .unwrap();
        assert_eq!(config.vco, None);
        assert_eq!(config.outputs[0].achieved, Frequency::from_mhz(123.456));
    }

    #[test]
    fn speedgrades_differ() {
        let SynthesizerLimits::Mmcm(fast) = SynthesizerLimits::s7_mmcm(-3) else {
            panic!("expected MMCM limits");
        };
        let SynthesizerLimits::Mmcm(slow) = SynthesizerLimits::s7_mmcm(-1) else {
            panic!("expected MMCM limits");
        };
        assert!(fast.vco_range.1 > slow.vco_range.1);
        assert_eq!(fast.fractional_step, Some(0.125));
        let SynthesizerLimits::Mmcm(pll) = SynthesizerLimits::s7_pll(-2) else {
            panic!("expected PLL limits");
        };
        assert_eq!(pll.fractional_step, None);
        assert_eq!(SynthesizerLimits::s7_pll(-2).primitive(), "PLLE2_ADV");
    }
}
