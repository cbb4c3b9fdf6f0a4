//! Analyze command implementation.

use crate::cli::AnalyzeArgs;
use crate::config::{AnalyzerKind, AppConfig};
use crate::error::{CliError, Result};
use chrono::Utc;
use marginalia_analyzers::{KeywordSentimentAnalyzer, LlmCategorizer, UsefulnessScorer};
use marginalia_domain::Analyzer;
use marginalia_engine::{Engine, OutputWriter};
use marginalia_llm::build_provider;
use marginalia_sandbox::{ScriptAnalyzer, ScriptSandbox};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the analyzer pipeline described by the configuration
///
/// Built-in analyzers run in `[analyzers].enabled` order, scripts after them.
pub fn build_analyzers(config: &AppConfig) -> Result<Vec<Arc<dyn Analyzer>>> {
    let provider = match &config.llm {
        Some(llm) if config.needs_llm() => Some(build_provider(llm)?),
        _ => None,
    };

    let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::new();
    for kind in &config.analyzers.enabled {
        match kind {
            AnalyzerKind::Categorizer => {
                let provider = provider.clone().ok_or_else(|| {
                    CliError::Config("the categorizer requires an [llm] section".to_string())
                })?;
                let categorizer = LlmCategorizer::new(provider, config.categorizer.clone())
                    .map_err(CliError::Config)?;
                analyzers.push(Arc::new(categorizer));
            }
            AnalyzerKind::Scorer if config.scorer_active() => {
                let scorer = UsefulnessScorer::new(config.scorer.clone(), provider.clone())
                    .map_err(CliError::Config)?;
                analyzers.push(Arc::new(scorer));
            }
            AnalyzerKind::Scorer => debug!("Scoring method is none, skipping scorer"),
            AnalyzerKind::Sentiment => analyzers.push(Arc::new(KeywordSentimentAnalyzer::new())),
        }
    }

    for path in &config.analyzers.scripts {
        let sandbox = ScriptSandbox::load(path, config.sandbox.clone())?;
        analyzers.push(Arc::new(ScriptAnalyzer::new(sandbox)));
    }

    Ok(analyzers)
}

/// Execute the analyze command, returning the file that was written.
pub async fn execute_analyze(args: AnalyzeArgs, mut config: AppConfig) -> Result<PathBuf> {
    config.apply_overrides(&args);
    config.validate()?;

    let analyzers = build_analyzers(&config)?;
    let mut engine = Engine::new(analyzers, config.engine_config())?;
    info!("Analyzers: {}", engine.analyzer_names().join(", "));

    // Resolve the generated name up front so write failures still get a partial dump
    let output = args.output.clone().unwrap_or_else(|| generated_output_path(&config));

    let abort = engine.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further bookmarks will be dispatched");
            abort.abort();
        }
    });

    let result = engine.analyze(&args.input, Some(&output)).await;
    interrupt.abort();
    let export = result?;
    let written = engine.last_output().unwrap_or(&output).to_path_buf();

    let errors = export
        .metadata
        .error_summary
        .as_ref()
        .map(|summary| summary.summary())
        .unwrap_or_else(|| "no errors".to_string());
    println!(
        "Analyzed {} bookmarks with {} analyzer(s) into {} ({})",
        export.bookmarks.len(),
        export.metadata.analyzers_used.len(),
        written.display(),
        errors
    );

    Ok(written)
}

fn generated_output_path(config: &AppConfig) -> PathBuf {
    let writer = OutputWriter::new(config.output.clone());
    let name = writer.resolve_filename(config.scoring_method(), Utc::now());
    config.output.directory.join(name)
}
