//! Error types for the build and programming collaborators.

use std::path::PathBuf;

/// Errors raised while rendering build inputs or invoking external tools.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A build output could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The assembly manifest could not be serialized.
    #[error("failed to serialize assembly manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// An external tool could not be started.
    #[error("failed to run '{tool}': {source}")]
    ToolNotFound {
        /// The executable name.
        tool: String,
        /// The spawn error.
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully.
    #[error("'{tool}' exited with {status}")]
    ToolFailed {
        /// The executable name.
        tool: String,
        /// The exit status description.
        status: String,
    },

    /// The board does not describe what the programmer needs.
    #[error("board '{board}' has no {what} configured")]
    MissingProgrammerInfo {
        /// The board part or name.
        board: String,
        /// The missing setting.
        what: &'static str,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}
