//! Script execution errors

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Ways a user script can fail
///
/// All variants are recoverable at the engine level: a failing script
/// contributes nothing for the bookmark at hand.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// Script path does not exist
    #[error("Script not found: {0}")]
    NotFound(PathBuf),

    /// Script path exists but is not a regular file
    #[error("Script is not a file: {0}")]
    NotAFile(PathBuf),

    /// No interpreter is registered for the script's extension
    #[error("Unsupported script extension: {0}")]
    UnsupportedExtension(String),

    /// Sandbox configuration is unusable
    #[error("Invalid sandbox configuration: {0}")]
    Config(String),

    /// The interpreter could not be started
    #[error("Failed to spawn '{command}': {message}")]
    Spawn {
        /// Interpreter command
        command: String,
        /// Underlying OS error
        message: String,
    },

    /// Pipe or process I/O failed
    #[error("Script I/O error: {0}")]
    Io(String),

    /// The script exited unsuccessfully
    #[error("Script exited with code {code:?}: {stderr}")]
    NonZeroExit {
        /// Exit code, absent when killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The script ran past its time limit and was killed
    #[error("Script timed out after {0:?}")]
    Timeout(Duration),

    /// Combined stdout and stderr exceeded the byte ceiling
    #[error("Script output exceeded {limit} bytes")]
    OutputTooLarge {
        /// Configured ceiling in bytes
        limit: usize,
    },

    /// Standard output was not valid JSON
    #[error("Script output is not valid JSON: {0}")]
    InvalidJson(String),

    /// Standard output was JSON of the wrong shape
    #[error("Script output has an invalid shape: {0}")]
    InvalidOutput(String),
}
