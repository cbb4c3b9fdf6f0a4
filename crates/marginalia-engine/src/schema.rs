//! Structural validation of export and analysis files

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

const METADATA_STRING_FIELDS: [&str; 4] = ["exportTimestamp", "exporterVersion", "userId", "username"];

const BOOKMARK_STRING_FIELDS: [&str; 6] = [
    "id",
    "url",
    "text",
    "authorUsername",
    "authorName",
    "createdAt",
];

const BOOKMARK_COUNT_FIELDS: [&str; 3] = ["likeCount", "retweetCount", "replyCount"];

const SCORING_METHODS: [&str; 4] = ["llm", "heuristic", "hybrid", "none"];

/// Outcome of validating one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the document unusable
    pub violations: Vec<String>,
    /// Suspicious but acceptable findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no violations were found
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations joined into one message
    pub fn message(&self) -> String {
        self.violations.join("; ")
    }

    fn violation(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }
}

/// Checks JSON documents against the export and analysis shapes
///
/// Every violation is collected; validation never stops at the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a bookmark export as read from disk
    pub fn validate_input(&self, document: &Value) -> ValidationReport {
        self.validate_document(document, false)
    }

    /// Validate an analysis export before it is written
    pub fn validate_output(&self, document: &Value) -> ValidationReport {
        self.validate_document(document, true)
    }

    fn validate_document(&self, document: &Value, analysed: bool) -> ValidationReport {
        let mut report = ValidationReport::default();

        let Some(root) = document.as_object() else {
            report.violation("document must be a JSON object");
            return report;
        };

        match root.get("metadata").and_then(Value::as_object) {
            Some(metadata) => {
                check_export_metadata(metadata, &mut report);
                if analysed {
                    check_analysis_metadata(metadata, &mut report);
                }
            }
            None => report.violation("metadata must be an object"),
        }

        match root.get("bookmarks").and_then(Value::as_array) {
            Some(bookmarks) => {
                let mut seen = HashSet::new();
                for (index, bookmark) in bookmarks.iter().enumerate() {
                    let Some(bookmark) = bookmark.as_object() else {
                        report.violation(format!("bookmarks[{}] must be an object", index));
                        continue;
                    };
                    check_bookmark(index, bookmark, &mut report);
                    if analysed {
                        check_enrichment(index, bookmark, &mut report);
                    }
                    if let Some(id) = bookmark.get("id").and_then(Value::as_str) {
                        if !seen.insert(id) {
                            report
                                .warnings
                                .push(format!("bookmarks[{}] repeats id '{}'", index, id));
                        }
                    }
                }
            }
            None => report.violation("bookmarks must be an array"),
        }

        for warning in &report.warnings {
            warn!("Schema warning: {}", warning);
        }
        report
    }
}

fn check_export_metadata(metadata: &Map<String, Value>, report: &mut ValidationReport) {
    for field in METADATA_STRING_FIELDS {
        if !metadata.get(field).is_some_and(Value::is_string) {
            report.violation(format!("metadata.{} must be a string", field));
        }
    }
    if !metadata.get("totalCount").is_some_and(is_count) {
        report.violation("metadata.totalCount must be a non-negative integer");
    }
}

fn check_analysis_metadata(metadata: &Map<String, Value>, report: &mut ValidationReport) {
    if !metadata.get("analysisTimestamp").is_some_and(Value::is_string) {
        report.violation("metadata.analysisTimestamp must be a string");
    }

    match metadata.get("scoringMethod").and_then(Value::as_str) {
        Some(method) if SCORING_METHODS.contains(&method) => {}
        _ => report.violation(format!(
            "metadata.scoringMethod must be one of {}",
            SCORING_METHODS.join(", ")
        )),
    }

    for field in ["categoriesApplied", "analyzersUsed"] {
        if !metadata.get(field).is_some_and(is_string_array) {
            report.violation(format!("metadata.{} must be an array of strings", field));
        }
    }

    if let Some(summary) = metadata.get("errorSummary") {
        check_error_summary(summary, report);
    }
}

fn check_error_summary(summary: &Value, report: &mut ValidationReport) {
    let Some(summary) = summary.as_object() else {
        report.violation("metadata.errorSummary must be an object");
        return;
    };

    if !summary.get("totalErrors").is_some_and(is_count) {
        report.violation("metadata.errorSummary.totalErrors must be a non-negative integer");
    }
    if !summary.get("criticalErrors").is_some_and(is_string_array) {
        report.violation("metadata.errorSummary.criticalErrors must be an array of strings");
    }

    match summary.get("bookmarkErrors").and_then(Value::as_array) {
        Some(errors) => {
            for (index, error) in errors.iter().enumerate() {
                let well_formed = error.as_object().is_some_and(|error| {
                    ["bookmarkId", "analyzerName", "error"]
                        .iter()
                        .all(|field| error.get(*field).is_some_and(Value::is_string))
                });
                if !well_formed {
                    report.violation(format!(
                        "metadata.errorSummary.bookmarkErrors[{}] must have string bookmarkId, analyzerName and error",
                        index
                    ));
                }
            }
        }
        None => report.violation("metadata.errorSummary.bookmarkErrors must be an array"),
    }
}

fn check_bookmark(index: usize, bookmark: &Map<String, Value>, report: &mut ValidationReport) {
    for field in BOOKMARK_STRING_FIELDS {
        if !bookmark.get(field).is_some_and(Value::is_string) {
            report.violation(format!("bookmarks[{}].{} must be a string", index, field));
        }
    }
    for field in BOOKMARK_COUNT_FIELDS {
        if !bookmark.get(field).is_some_and(is_count) {
            report.violation(format!(
                "bookmarks[{}].{} must be a non-negative integer",
                index, field
            ));
        }
    }
}

fn check_enrichment(index: usize, bookmark: &Map<String, Value>, report: &mut ValidationReport) {
    if let Some(categories) = bookmark.get("categories") {
        let valid = categories.as_array().is_some_and(|items| {
            items
                .iter()
                .all(|item| item.as_str().is_some_and(|s| !s.trim().is_empty()))
        });
        if !valid {
            report.violation(format!(
                "bookmarks[{}].categories must be an array of non-empty strings",
                index
            ));
        }
    }

    if let Some(score) = bookmark.get("usefulnessScore") {
        if !score.as_u64().is_some_and(|score| score <= 100) {
            report.violation(format!(
                "bookmarks[{}].usefulnessScore must be an integer between 0 and 100",
                index
            ));
        }
    }

    if let Some(custom) = bookmark.get("customAnalysis") {
        if !custom.is_object() {
            report.violation(format!("bookmarks[{}].customAnalysis must be an object", index));
        }
    }
}

fn is_count(value: &Value) -> bool {
    value.is_u64()
}

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}
