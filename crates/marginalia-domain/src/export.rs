//! Export containers for input and output files

use crate::{BookmarkRecord, EnrichedBookmarkRecord, ErrorSummary, ScoringMethod};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata written by the bookmark exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// When the export was taken
    pub export_timestamp: String,

    /// Number of bookmarks the exporter reported
    pub total_count: u64,

    /// Version of the exporter that produced the file
    pub exporter_version: String,

    /// Account identifier of the bookmark owner
    pub user_id: String,

    /// Handle of the bookmark owner
    pub username: String,

    /// Exporter fields this crate does not model, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw export as read from disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysableExport {
    /// Exporter metadata
    pub metadata: ExportMetadata,

    /// Bookmarks in export order
    pub bookmarks: Vec<BookmarkRecord>,
}

/// Metadata of an enriched export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Original exporter metadata, carried through unchanged
    #[serde(flatten)]
    pub source: ExportMetadata,

    /// When analysis completed
    pub analysis_timestamp: String,

    /// Deduplicated union of every category assigned
    pub categories_applied: Vec<String>,

    /// How usefulness scores were produced
    pub scoring_method: ScoringMethod,

    /// Analyzer names in configured order
    pub analyzers_used: Vec<String>,

    /// Present only when at least one error occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<ErrorSummary>,
}

/// Enriched export as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisExport {
    /// Export metadata plus analysis fields
    pub metadata: AnalysisMetadata,

    /// Enriched bookmarks, same length and order as the input
    pub bookmarks: Vec<EnrichedBookmarkRecord>,
}
