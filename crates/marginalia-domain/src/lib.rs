//! Marginalia Domain Layer
//!
//! This crate contains the data model and trait interfaces shared by every
//! other Marginalia crate. It performs no I/O of its own.
//!
//! ## Key Concepts
//!
//! - **Bookmark**: One saved social-media post, as written by the bookmark exporter
//! - **Enriched bookmark**: A bookmark plus analyzer-supplied categories, score and custom fields
//! - **Analyzer**: A pluggable capability that inspects one bookmark
//! - **Error summary**: Accumulated per-bookmark and critical failures for a run
//!
//! ## Architecture
//!
//! - Pure data types and merge logic only
//! - Infrastructure (LLM clients, subprocesses, files) lives in other crates
//! - Trait definitions for every external interaction

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod bookmark;
pub mod error;
pub mod error_summary;
pub mod export;
pub mod scoring;
pub mod traits;

// Re-exports for convenience
pub use analysis::{AnalysisResult, ResultMerger};
pub use bookmark::{BookmarkRecord, EnrichedBookmarkRecord};
pub use error::AnalyzerError;
pub use error_summary::{BookmarkError, ErrorSummary};
pub use export::{AnalysableExport, AnalysisExport, AnalysisMetadata, ExportMetadata};
pub use scoring::ScoringMethod;
pub use traits::{Analyzer, LlmProvider};
