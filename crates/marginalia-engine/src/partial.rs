//! Crash-recovery dumps written when a run fails

use crate::EngineError;
use marginalia_domain::{EnrichedBookmarkRecord, ErrorSummary, ExportMetadata};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where the partial dump for a run goes
///
/// `out.json` becomes `out_partial.json`. Without an output path the dump
/// sits next to the input as `<input stem>_analysis_partial.json`.
pub fn partial_path(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(output) => {
            let stem = output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            let name = match output.extension() {
                Some(ext) => format!("{}_partial.{}", stem, ext.to_string_lossy()),
                None => format!("{}_partial", stem),
            };
            output.with_file_name(name)
        }
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bookmarks".to_string());
            input.with_file_name(format!("{}_analysis_partial.json", stem))
        }
    }
}

/// Contents of a partial dump
#[derive(Debug, Clone, Serialize)]
pub struct PartialResults {
    /// Source metadata (when it was read) plus the error summary
    pub metadata: PartialMetadata,

    /// Bookmarks processed before the failure
    pub bookmarks: Vec<EnrichedBookmarkRecord>,
}

/// Metadata section of a partial dump
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialMetadata {
    /// Exporter metadata, absent when the input could not be read
    #[serde(flatten)]
    pub source: Option<ExportMetadata>,

    /// Always true; marks the file as incomplete
    pub partial: bool,

    /// Failures up to and including the critical one
    pub error_summary: ErrorSummary,
}

impl PartialResults {
    /// Build a dump
    pub fn new(
        source: Option<ExportMetadata>,
        bookmarks: Vec<EnrichedBookmarkRecord>,
        error_summary: ErrorSummary,
    ) -> Self {
        Self {
            metadata: PartialMetadata {
                source,
                partial: true,
                error_summary,
            },
            bookmarks,
        }
    }

    /// Write the dump as pretty JSON, replacing an older dump
    pub fn write(&self, path: &Path) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| EngineError::Validation(format!("Failed to serialize partial results: {}", e)))?;
        std::fs::write(path, json).map_err(|e| EngineError::io(path, e))
    }
}
