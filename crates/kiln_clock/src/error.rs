//! Error types for clock graph construction and finalization.

use crate::ids::SynthesizerId;

/// Errors raised while building or finalizing a [`ClockGraph`](crate::ClockGraph).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    /// A domain with this name already exists.
    #[error("duplicate clock domain '{name}'")]
    DuplicateDomain {
        /// The repeated name.
        name: String,
    },

    /// `derive` referenced an upstream domain that does not exist yet.
    #[error("clock domain '{name}' derives from unknown upstream '{upstream}'")]
    UnknownUpstream {
        /// The domain being derived.
        name: String,
        /// The missing upstream.
        upstream: String,
    },

    /// A false path or query named a domain that does not exist.
    #[error("unknown clock domain '{name}'")]
    UnknownDomain {
        /// The missing domain.
        name: String,
    },

    /// A domain is not reachable from any root oscillator.
    #[error("clock domain '{name}' is not reachable from any root")]
    OrphanDomain {
        /// The unreachable domain.
        name: String,
    },

    /// Outputs of one synthesizer referenced different upstream domains.
    #[error("synthesizer {synthesizer} is fed by '{expected}', not '{found}'")]
    SynthesizerUpstreamMismatch {
        /// The synthesizer instance.
        synthesizer: SynthesizerId,
        /// Upstream recorded by the first output.
        expected: String,
        /// Upstream given by the offending output.
        found: String,
    },

    /// No divider setting satisfies every output of a synthesizer.
    #[error("no configuration found for synthesizer '{name}': {reason}")]
    UnsolvableSynthesizer {
        /// The synthesizer's instance name.
        name: String,
        /// What could not be met.
        reason: String,
    },

    /// A frequency was zero, negative, or not finite.
    #[error("clock domain '{name}' has invalid frequency {hz} Hz")]
    InvalidFrequency {
        /// The domain.
        name: String,
        /// The rejected value in Hz.
        hz: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_upstream() {
        let err = ClockError::UnknownUpstream {
            name: "sys".to_string(),
            upstream: "clk100".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "clock domain 'sys' derives from unknown upstream 'clk100'"
        );
    }

    #[test]
    fn display_mismatch() {
        let err = ClockError::SynthesizerUpstreamMismatch {
            synthesizer: SynthesizerId::from_raw(0),
            expected: "clk50".to_string(),
            found: "sys".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "synthesizer pll0 is fed by 'clk50', not 'sys'"
        );
    }

    #[test]
    fn display_orphan() {
        let err = ClockError::OrphanDomain {
            name: "hdmi".to_string(),
        };
        assert_eq!(format!("{err}"), "clock domain 'hdmi' is not reachable from any root");
    }
}
