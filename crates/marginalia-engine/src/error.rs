//! Error types for engine operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an analysis run
///
/// Every variant returned from [`Engine::analyze`](crate::Engine::analyze)
/// has already left a partial dump behind.
///
/// Per-bookmark analyzer failures are not represented here; they are
/// recorded in the run's error summary instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input was not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input or output does not match the export schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Input file does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Reading or writing a file failed
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// Engine configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}
