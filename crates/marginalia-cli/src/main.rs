//! Marginalia CLI - bookmark analysis from the command line.

use clap::Parser;
use marginalia_cli::commands;
use marginalia_cli::{AppConfig, Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> marginalia_cli::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze(args) => {
            commands::execute_analyze(args, config).await?;
        }
        Command::Validate(args) => commands::execute_validate(args)?,
        Command::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}
