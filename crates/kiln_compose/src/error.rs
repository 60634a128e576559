//! Error types for feature parsing and target composition.

use kiln_clock::ClockError;
use kiln_resource::ResourceError;

/// Errors raised while parsing flags or composing a target.
///
/// Every variant aborts the composition attempt; no partial
/// [`TargetAssembly`](crate::TargetAssembly) is ever returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    /// Two enabled features cannot be combined, or a feature value is out of range.
    #[error("invalid feature combination: {0}")]
    InvalidFeatureCombination(String),

    /// A flag name is not recognized.
    #[error("unknown feature flag '{0}'")]
    UnknownFlag(String),

    /// A flag value has the wrong type or cannot be parsed.
    #[error("invalid value for flag '{name}': expected {expected}, found {found}")]
    InvalidFlagValue {
        /// The flag name.
        name: String,
        /// What the flag accepts.
        expected: &'static str,
        /// The rejected value.
        found: String,
    },

    /// A resource could not be bound.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The clock graph could not be built or finalized.
    #[error(transparent)]
    Clock(#[from] ClockError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_combination() {
        let err = ComposeError::InvalidFeatureCombination(
            "etherbone cannot use a dynamic IP address".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "invalid feature combination: etherbone cannot use a dynamic IP address"
        );
    }

    #[test]
    fn display_invalid_flag_value() {
        let err = ComposeError::InvalidFlagValue {
            name: "with_sdram".to_string(),
            expected: "a boolean",
            found: "\"yes\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for flag 'with_sdram': expected a boolean, found \"yes\""
        );
    }

    #[test]
    fn wrapped_errors_are_transparent() {
        let err: ComposeError = ResourceError::ResourceAlreadyBound {
            name: "ddram".to_string(),
            index: 0,
        }
        .into();
        assert_eq!(err.to_string(), "resource 'ddram' index 0 is already bound");
    }
}
