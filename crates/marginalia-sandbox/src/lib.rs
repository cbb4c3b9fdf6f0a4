//! Marginalia Script Sandbox
//!
//! Runs user-supplied analysis scripts as isolated subprocesses.
//!
//! # Protocol
//!
//! - The bookmark is written to the script's stdin as a single JSON object
//! - The script prints one JSON object to stdout with any of `categories`,
//!   `usefulnessScore` and `customFields`
//! - A non-zero exit, a timeout, oversized output or malformed JSON makes the
//!   result empty for that bookmark
//!
//! The interpreter is chosen by file extension (see [`SandboxConfig`]).
//!
//! # Example
//!
//! ```no_run
//! use marginalia_sandbox::{SandboxConfig, ScriptAnalyzer, ScriptSandbox};
//!
//! let sandbox = ScriptSandbox::load("scripts/tagger.py", SandboxConfig::default()).unwrap();
//! let analyzer = ScriptAnalyzer::new(sandbox);
//! ```

#![warn(missing_docs)]

mod analyzer;
mod config;
mod error;
mod sandbox;
mod validate;

pub use analyzer::ScriptAnalyzer;
pub use config::{Interpreter, SandboxConfig};
pub use error::ScriptError;
pub use sandbox::ScriptSandbox;
pub use validate::output_violations;
