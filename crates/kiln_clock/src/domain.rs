//! Clock domain records and the parameters used to derive them.

use crate::ids::SynthesizerId;
use kiln_common::Frequency;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role a derived domain plays, used to share domains between subsystems.
///
/// Two requests for the same frequency and purpose resolve to one domain;
/// the same frequency with different purposes stays separate (a 200 MHz
/// IDELAYCTRL reference is not a 200 MHz serializer clock).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// A physical oscillator input.
    Reference,
    /// The main system clock.
    System,
    /// The 4x memory PHY serdes clock.
    System4x,
    /// The IDELAYCTRL calibration reference.
    DelayCalibration,
    /// A video pixel clock.
    Pixel,
    /// A 5x video serializer clock.
    Serializer,
    /// Anything else, named by the requesting subsystem.
    Custom(String),
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Reference => f.write_str("reference"),
            Purpose::System => f.write_str("system"),
            Purpose::System4x => f.write_str("system4x"),
            Purpose::DelayCalibration => f.write_str("delay-calibration"),
            Purpose::Pixel => f.write_str("pixel"),
            Purpose::Serializer => f.write_str("serializer"),
            Purpose::Custom(tag) => f.write_str(tag),
        }
    }
}

/// Where a domain's clock comes from.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainSource {
    /// An external oscillator, optionally tied to the pin resource it enters on.
    Root {
        /// Name of the resource carrying the oscillator.
        resource: Option<String>,
    },
    /// An output of a synthesizer fed by `upstream`.
    Derived {
        /// The domain feeding the synthesizer.
        upstream: String,
        /// The synthesizer producing this domain.
        synthesizer: SynthesizerId,
    },
}

/// A named clock at a specific frequency.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ClockDomain {
    /// Unique domain name (e.g. `sys`, `idelay`).
    pub name: String,
    /// Requested frequency.
    pub frequency: Frequency,
    /// Root oscillator or synthesizer output.
    pub source: DomainSource,
    /// Relative tolerance on the achieved frequency (0.01 = 1%).
    pub margin: f64,
    /// Role of the domain, used for sharing.
    pub purpose: Purpose,
}

impl ClockDomain {
    /// Returns `true` for oscillator-fed domains.
    pub fn is_root(&self) -> bool {
        matches!(self.source, DomainSource::Root { .. })
    }

    /// Returns the upstream domain name of a derived domain.
    pub fn upstream(&self) -> Option<&str> {
        match &self.source {
            DomainSource::Root { .. } => None,
            DomainSource::Derived { upstream, .. } => Some(upstream),
        }
    }

    /// Returns the synthesizer of a derived domain.
    pub fn synthesizer(&self) -> Option<SynthesizerId> {
        match &self.source {
            DomainSource::Root { .. } => None,
            DomainSource::Derived { synthesizer, .. } => Some(*synthesizer),
        }
    }
}

/// Parameters of a derived output.
#[derive(Clone, PartialEq, Debug)]
pub struct DeriveSpec {
    /// Requested output frequency.
    pub frequency: Frequency,
    /// Relative tolerance, zero by default.
    pub margin: f64,
    /// Role of the output.
    pub purpose: Purpose,
}

impl DeriveSpec {
    /// An output that must hit `frequency` exactly.
    pub fn exact(frequency: Frequency, purpose: Purpose) -> Self {
        Self {
            frequency,
            margin: 0.0,
            purpose,
        }
    }

    /// Sets the relative tolerance.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

/// A declared timing exemption between two domains.
///
/// Stored with the names in sorted order, so `(a, b)` and `(b, a)` are the
/// same path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FalsePath {
    /// The lexically smaller domain name.
    pub from: String,
    /// The lexically larger domain name.
    pub to: String,
}

impl FalsePath {
    /// Creates a normalized false path between two domains.
    pub fn between(a: &str, b: &str) -> Self {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_path_is_order_insensitive() {
        assert_eq!(FalsePath::between("sys", "clk50"), FalsePath::between("clk50", "sys"));
        assert_eq!(FalsePath::between("sys", "clk50").from, "clk50");
    }

    #[test]
    fn derived_accessors() {
        let d = ClockDomain {
            name: "sys4x".to_string(),
            frequency: Frequency::from_mhz(400.0),
            source: DomainSource::Derived {
                upstream: "clk50".to_string(),
                synthesizer: SynthesizerId::from_raw(0),
            },
            margin: 0.0,
            purpose: Purpose::System4x,
        };
        assert!(!d.is_root());
        assert_eq!(d.upstream(), Some("clk50"));
        assert_eq!(d.synthesizer(), Some(SynthesizerId::from_raw(0)));
    }

    #[test]
    fn purpose_display() {
        assert_eq!(Purpose::DelayCalibration.to_string(), "delay-calibration");
        assert_eq!(Purpose::Custom("usb".to_string()).to_string(), "usb");
    }

    #[test]
    fn source_serde_is_tagged() {
        let src = DomainSource::Root {
            resource: Some("clk50".to_string()),
        };
        let json = serde_json::to_string(&src).unwrap();
        assert_eq!(json, r#"{"kind":"root","resource":"clk50"}"#);
    }

    #[test]
    fn derive_spec_builder() {
        let spec = DeriveSpec::exact(Frequency::from_mhz(200.0), Purpose::DelayCalibration)
            .with_margin(1e-2);
        assert_eq!(spec.margin, 1e-2);
    }
}
