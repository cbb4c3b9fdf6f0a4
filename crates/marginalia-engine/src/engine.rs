//! The analysis engine: read, validate, analyze, write

use crate::config::EngineConfig;
use crate::partial::{partial_path, PartialResults};
use crate::pool::{AbortHandle, PoolStats, WorkerPool};
use crate::schema::SchemaValidator;
use crate::writer::OutputWriter;
use crate::EngineError;
use chrono::{SecondsFormat, Utc};
use marginalia_domain::{
    AnalysableExport, AnalysisExport, AnalysisMetadata, Analyzer, AnalyzerError, BookmarkRecord,
    EnrichedBookmarkRecord, ErrorSummary, ExportMetadata, ResultMerger,
};
use serde_json::Value;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Analyzer name under which pool-level failures are recorded
pub const WORKER_POOL_ANALYZER: &str = "worker-pool";

/// Lifecycle of an [`Engine`]
///
/// `Idle` is the initial state; every [`Engine::analyze`] call walks
/// `Reading → Validating → Analyzing` and ends in `Completed` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No run started yet
    Idle,
    /// Loading the input file
    Reading,
    /// Checking the input against the export schema
    Validating,
    /// Running analyzers and writing output
    Analyzing,
    /// The last run succeeded
    Completed,
    /// The last run failed and a partial dump was attempted
    Failed,
}

struct AnalyzerFailure {
    analyzer_name: String,
    error: AnalyzerError,
}

struct PipelineOutput {
    record: EnrichedBookmarkRecord,
    failures: Vec<AnalyzerFailure>,
}

#[derive(Default)]
struct Progress {
    source: Option<ExportMetadata>,
    bookmarks: Vec<EnrichedBookmarkRecord>,
    summary: Option<ErrorSummary>,
}

/// Runs a fixed list of analyzers over bookmark exports
///
/// The engine's [`ErrorSummary`] accumulates across runs until
/// [`reset_error_summary`](Self::reset_error_summary) is called.
pub struct Engine {
    analyzers: Arc<Vec<Arc<dyn Analyzer>>>,
    config: EngineConfig,
    pool: WorkerPool,
    writer: OutputWriter,
    validator: SchemaValidator,
    error_summary: ErrorSummary,
    state: EngineState,
    last_output: Option<PathBuf>,
}

impl Engine {
    /// Create an engine; analyzers run in the given order
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        let pool = WorkerPool::new(config.pool.clone()).map_err(EngineError::Config)?;
        let writer = OutputWriter::new(config.output.clone());

        Ok(Self {
            analyzers: Arc::new(analyzers),
            config,
            pool,
            writer,
            validator: SchemaValidator::new(),
            error_summary: ErrorSummary::new(),
            state: EngineState::Idle,
            last_output: None,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyzer names in run order
    pub fn analyzer_names(&self) -> Vec<String> {
        self.analyzers.iter().map(|a| a.name().to_string()).collect()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// File written by the last successful [`analyze`](Self::analyze)
    ///
    /// Differs from the requested output path when that path was already
    /// taken and a sibling name was chosen.
    pub fn last_output(&self) -> Option<&Path> {
        self.last_output.as_deref()
    }

    /// Errors accumulated so far
    pub fn error_summary(&self) -> &ErrorSummary {
        &self.error_summary
    }

    /// Forget accumulated errors
    pub fn reset_error_summary(&mut self) {
        self.error_summary.reset();
    }

    /// Worker pool counters
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Handle to stop dispatching bookmarks mid-run
    pub fn abort_handle(&self) -> AbortHandle {
        self.pool.abort_handle()
    }

    /// Read and validate a bookmark export
    pub fn read_export_file(&self, path: &Path) -> Result<AnalysableExport, EngineError> {
        let document = read_document(path)?;
        self.parse_export(document)
    }

    /// Run every analyzer over one bookmark
    ///
    /// Failing analyzers contribute nothing and are recorded in the error
    /// summary.
    pub async fn analyze_bookmark(&mut self, bookmark: &BookmarkRecord) -> EnrichedBookmarkRecord {
        let output = run_pipeline(&self.analyzers, bookmark, self.config.analyzer_timeout()).await;
        for failure in output.failures {
            self.error_summary.record_bookmark_error(
                &bookmark.id,
                failure.analyzer_name,
                failure.error.to_string(),
            );
        }
        output.record
    }

    /// Analyze every bookmark of an export
    ///
    /// Bookmarks keep their input order. A bookmark whose work item panicked
    /// or was skipped after an abort is carried over without enrichment.
    pub async fn analyze_export(&mut self, export: AnalysableExport) -> AnalysisExport {
        let AnalysableExport {
            metadata,
            bookmarks,
        } = export;
        info!(
            "Analyzing {} bookmarks with {} analyzers",
            bookmarks.len(),
            self.analyzers.len()
        );

        let originals: Vec<Arc<BookmarkRecord>> = bookmarks.into_iter().map(Arc::new).collect();
        let analyzers = Arc::clone(&self.analyzers);
        let timeout = self.config.analyzer_timeout();

        let outcomes = self
            .pool
            .process(originals.clone(), move |bookmark: Arc<BookmarkRecord>| {
                let analyzers = Arc::clone(&analyzers);
                async move { run_pipeline(&analyzers, &bookmark, timeout).await }
            })
            .await;

        // Workers never touch the summary; failures are folded in after join
        let mut run_summary = ErrorSummary::new();
        let mut enriched = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let original = &originals[outcome.sequence];
            match outcome.result {
                Ok(output) => {
                    for failure in output.failures {
                        run_summary.record_bookmark_error(
                            &original.id,
                            failure.analyzer_name,
                            failure.error.to_string(),
                        );
                    }
                    enriched.push(output.record);
                }
                Err(e) => {
                    run_summary.record_bookmark_error(&original.id, WORKER_POOL_ANALYZER, e.to_string());
                    enriched.push(EnrichedBookmarkRecord::unenriched(original.as_ref().clone()));
                }
            }
        }

        let analysed = AnalysisExport {
            metadata: AnalysisMetadata {
                source: metadata,
                analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                categories_applied: categories_applied(&enriched),
                scoring_method: self.config.scoring_method,
                analyzers_used: self.analyzer_names(),
                error_summary: (run_summary.total_errors > 0).then(|| run_summary.clone()),
            },
            bookmarks: enriched,
        };

        info!(
            "Analysis complete: {} bookmarks, {} categories, {} analyzer errors",
            analysed.bookmarks.len(),
            analysed.metadata.categories_applied.len(),
            run_summary.total_errors
        );
        self.error_summary.absorb(run_summary);
        analysed
    }

    /// Read, analyze and optionally write an export
    ///
    /// On failure a partial dump is written next to the output (or the
    /// input when no output was given) and the original error is returned.
    pub async fn analyze(
        &mut self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<AnalysisExport, EngineError> {
        let mut progress = Progress::default();
        self.last_output = None;

        match self.run(input, output, &mut progress).await {
            Ok(export) => {
                self.state = EngineState::Completed;
                Ok(export)
            }
            Err(err) => {
                self.state = EngineState::Failed;
                error!("Analysis of {} failed: {}", input.display(), err);

                let message = err.to_string();
                self.error_summary.record_critical(message.clone());

                let mut summary = progress.summary.take().unwrap_or_default();
                summary.record_critical(message);
                let path = partial_path(input, output);
                match PartialResults::new(progress.source, progress.bookmarks, summary).write(&path) {
                    Ok(()) => warn!("Partial results written to {}", path.display()),
                    Err(e) => error!("Failed to write partial results: {}", e),
                }

                Err(err)
            }
        }
    }

    /// Write an export using the configured filename pattern
    pub fn write_output(&self, export: &AnalysisExport) -> Result<PathBuf, EngineError> {
        self.writer.write(export)
    }

    async fn run(
        &mut self,
        input: &Path,
        output: Option<&Path>,
        progress: &mut Progress,
    ) -> Result<AnalysisExport, EngineError> {
        self.state = EngineState::Reading;
        let document = read_document(input)?;

        self.state = EngineState::Validating;
        let export = self.parse_export(document)?;
        progress.source = Some(export.metadata.clone());

        self.state = EngineState::Analyzing;
        let analysed = self.analyze_export(export).await;

        if let Some(path) = output {
            match self.writer.write_to(&analysed, path) {
                Ok(written) => self.last_output = Some(written),
                Err(e) => {
                    progress.summary = analysed.metadata.error_summary;
                    progress.bookmarks = analysed.bookmarks;
                    return Err(e);
                }
            }
        }
        Ok(analysed)
    }

    fn parse_export(&self, document: Value) -> Result<AnalysableExport, EngineError> {
        let report = self.validator.validate_input(&document);
        if !report.is_valid() {
            return Err(EngineError::Validation(report.message()));
        }
        serde_json::from_value(document).map_err(|e| EngineError::Validation(e.to_string()))
    }
}

fn read_document(path: &Path) -> Result<Value, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::NotFound(path.to_path_buf()),
        _ => EngineError::io(path, e),
    })?;
    debug!("Read {} bytes from {}", raw.len(), path.display());
    serde_json::from_str(&raw).map_err(|e| EngineError::Parse(format!("{}: {}", path.display(), e)))
}

async fn run_pipeline(
    analyzers: &[Arc<dyn Analyzer>],
    bookmark: &BookmarkRecord,
    timeout: Duration,
) -> PipelineOutput {
    let mut merger = ResultMerger::new();
    let mut failures = Vec::new();

    for analyzer in analyzers {
        let result = match tokio::time::timeout(timeout, analyzer.analyze(bookmark)).await {
            Ok(result) => result,
            Err(_) => Err(AnalyzerError::Timeout(timeout.as_secs())),
        };

        match result {
            Ok(result) => merger.merge(result),
            Err(error) => {
                warn!(
                    "Analyzer {} failed for bookmark {}: {}",
                    analyzer.name(),
                    bookmark.id,
                    error
                );
                failures.push(AnalyzerFailure {
                    analyzer_name: analyzer.name().to_string(),
                    error,
                });
            }
        }
    }

    debug!("Bookmark {} analyzed", bookmark.id);
    PipelineOutput {
        record: merger.finish(bookmark),
        failures,
    }
}

/// First-seen union of every category in the export
fn categories_applied(bookmarks: &[EnrichedBookmarkRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    bookmarks
        .iter()
        .filter_map(|b| b.categories.as_ref())
        .flatten()
        .filter(|category| seen.insert(category.as_str()))
        .cloned()
        .collect()
}
