//! Accumulated failures for an analysis run

use serde::{Deserialize, Serialize};

/// One analyzer failing for one bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkError {
    /// Bookmark the analyzer was working on
    pub bookmark_id: String,

    /// Name of the analyzer that failed
    pub analyzer_name: String,

    /// Error message
    pub error: String,
}

/// Errors collected while analyzing an export
///
/// Only the dispatching context mutates a summary; workers hand their
/// failures back as values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    /// Count of analyzer-level failures
    pub total_errors: usize,

    /// Analyzer-level failures in the order they were recorded
    pub bookmark_errors: Vec<BookmarkError>,

    /// Messages for failures that aborted the whole run
    pub critical_errors: Vec<String>,
}

impl ErrorSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one analyzer failure
    pub fn record_bookmark_error(
        &mut self,
        bookmark_id: impl Into<String>,
        analyzer_name: impl Into<String>,
        error: impl Into<String>,
    ) {
        self.bookmark_errors.push(BookmarkError {
            bookmark_id: bookmark_id.into(),
            analyzer_name: analyzer_name.into(),
            error: error.into(),
        });
        self.total_errors += 1;
    }

    /// Record a failure that aborted the run
    pub fn record_critical(&mut self, message: impl Into<String>) {
        self.critical_errors.push(message.into());
    }

    /// Fold another summary into this one
    pub fn absorb(&mut self, other: ErrorSummary) {
        self.total_errors += other.total_errors;
        self.bookmark_errors.extend(other.bookmark_errors);
        self.critical_errors.extend(other.critical_errors);
    }

    /// Whether anything at all was recorded
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0 || !self.critical_errors.is_empty()
    }

    /// Clear counts and both error lists
    pub fn reset(&mut self) {
        self.total_errors = 0;
        self.bookmark_errors.clear();
        self.critical_errors.clear();
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Analysis Error Summary".to_string(),
            "======================".to_string(),
            format!("Analyzer errors: {}", self.total_errors),
            format!("Critical errors: {}", self.critical_errors.len()),
        ];

        if !self.bookmark_errors.is_empty() {
            lines.push(String::new());
            lines.push("Failures by bookmark:".to_string());
            for failure in &self.bookmark_errors {
                lines.push(format!(
                    "  {} [{}]: {}",
                    failure.bookmark_id, failure.analyzer_name, failure.error
                ));
            }
        }

        if !self.critical_errors.is_empty() {
            lines.push(String::new());
            lines.push("Critical:".to_string());
            for message in &self.critical_errors {
                lines.push(format!("  {}", message));
            }
        }

        lines.join("\n")
    }
}
