//! Error types for board catalog and profile loading.

use kiln_resource::ResourceError;
use std::path::PathBuf;

/// Errors raised while loading a board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// No built-in board has the requested name.
    #[error("unknown board '{name}'. Available: {available}")]
    UnknownBoard {
        /// The requested name.
        name: String,
        /// Comma-separated built-in board names.
        available: String,
    },

    /// The device part number does not name a supported family.
    #[error("unsupported device part '{0}'")]
    UnsupportedPart(String),

    /// The board profile file could not be read.
    #[error("failed to read board profile {path}: {source}")]
    Io {
        /// The profile path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The board profile is not valid TOML or has the wrong shape.
    #[error("failed to parse board profile: {0}")]
    Parse(String),

    /// The default clock does not name a resource in the pin table.
    #[error("default clock '{0}' is not in the pin table")]
    MissingDefaultClock(String),

    /// The pin table is inconsistent.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
