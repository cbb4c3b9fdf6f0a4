//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use marginalia_domain::ScoringMethod;
use std::path::PathBuf;

/// Marginalia - enrich bookmark exports with categories and usefulness scores.
#[derive(Debug, Parser)]
#[command(name = "marginalia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ~/.marginalia/config.toml)
    #[arg(short, long, global = true, env = "MARGINALIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a bookmark export
    Analyze(AnalyzeArgs),

    /// Check a file against the export or analysis schema
    Validate(ValidateArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the analyze command.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Bookmark export to analyze
    pub input: PathBuf,

    /// Output file (defaults to a generated name in the output directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Scoring method (llm, heuristic, hybrid, none)
    #[arg(short, long)]
    pub scoring: Option<ScoringMethod>,

    /// Additional analysis script; may be repeated
    #[arg(long = "script", value_name = "PATH")]
    pub scripts: Vec<PathBuf>,

    /// Process bookmarks one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Worker pool size
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// File to validate
    pub input: PathBuf,

    /// Validate as an analysis export rather than a bookmark export
    #[arg(long)]
    pub analysed: bool,
}
