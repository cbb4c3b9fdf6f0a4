//! Analyzer-level error type

use thiserror::Error;

/// One analyzer failed for one bookmark
///
/// Always recoverable: the engine records it and carries on with the
/// remaining analyzers and bookmarks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// The backing provider (LLM, network) failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider answered but the answer was unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// An external script misbehaved
    #[error("Script error: {0}")]
    Script(String),

    /// The analyzer exceeded its time budget
    #[error("Analyzer timed out after {0}s")]
    Timeout(u64),

    /// Anything else
    #[error("Analyzer error: {0}")]
    Other(String),
}
