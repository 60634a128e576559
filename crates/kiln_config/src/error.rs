//! Error types for configuration loading and validation.

use kiln_compose::ComposeError;

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A referenced target name does not exist in the configuration.
    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The merged feature flags do not form a valid feature set.
    #[error(transparent)]
    Features(#[from] ComposeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_target() {
        let err = ConfigError::UnknownTarget("nonexistent".to_string());
        assert_eq!(format!("{err}"), "unknown target 'nonexistent'");
    }

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.board".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.board");
    }

    #[test]
    fn display_features_is_transparent() {
        let err = ConfigError::from(ComposeError::UnknownFlag("with_turbo".to_string()));
        assert_eq!(format!("{err}"), "unknown feature flag 'with_turbo'");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
