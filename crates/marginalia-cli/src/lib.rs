//! Marginalia CLI library.
//!
//! Argument parsing, configuration loading and the command implementations
//! behind the `marginalia` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command};
pub use config::AppConfig;
pub use error::{CliError, Result};
