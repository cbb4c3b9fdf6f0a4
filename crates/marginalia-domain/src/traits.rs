//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the engine and the
//! infrastructure that does the actual analysis.

use crate::{AnalysisResult, AnalyzerError, BookmarkRecord};
use async_trait::async_trait;
use std::fmt::Display;

/// A pluggable capability that inspects one bookmark
///
/// Implemented by `marginalia-analyzers` and `marginalia-sandbox`. The engine
/// holds analyzers as trait objects and runs them in configured order.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name used in logs, error summaries and `analyzersUsed`
    fn name(&self) -> &str;

    /// Analyze a bookmark without mutating it
    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (`marginalia-llm`)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: Display + Send + Sync;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Generate a completion for a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String, Self::Error>;
}
