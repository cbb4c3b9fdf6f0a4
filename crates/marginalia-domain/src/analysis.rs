//! Sparse analyzer output and the policy for merging it into a record

use crate::{BookmarkRecord, EnrichedBookmarkRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a single analyzer contributed for one bookmark
///
/// Every field is optional; an empty result means "no contribution".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Categories, in the analyzer's preferred order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Usefulness score in `0..=100`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usefulness_score: Option<u8>,

    /// Arbitrary extra fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Map<String, Value>>,
}

impl AnalysisResult {
    /// An empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Result carrying only categories
    pub fn with_categories(categories: Vec<String>) -> Self {
        Self {
            categories: Some(categories),
            ..Self::default()
        }
    }

    /// Result carrying only a score (clamped to 100)
    pub fn with_score(score: u8) -> Self {
        Self {
            usefulness_score: Some(score.min(100)),
            ..Self::default()
        }
    }

    /// Result carrying only custom fields
    pub fn with_custom_fields(fields: Map<String, Value>) -> Self {
        Self {
            custom_fields: Some(fields),
            ..Self::default()
        }
    }

    /// Whether the analyzer contributed nothing
    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.usefulness_score.is_none() && self.custom_fields.is_none()
    }
}

/// Accumulates analyzer results for one bookmark in configured order
///
/// - categories are concatenated, duplicates included, blank entries dropped
/// - the last score wins
/// - custom fields are shallow-merged, later keys overwrite earlier ones
#[derive(Debug, Clone, Default)]
pub struct ResultMerger {
    categories: Option<Vec<String>>,
    usefulness_score: Option<u8>,
    custom_fields: Option<Map<String, Value>>,
}

impl ResultMerger {
    /// Start with no contributions
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the next analyzer's result
    pub fn merge(&mut self, result: AnalysisResult) {
        if let Some(categories) = result.categories {
            let kept: Vec<String> = categories
                .into_iter()
                .filter(|category| !category.trim().is_empty())
                .collect();
            if !kept.is_empty() {
                self.categories.get_or_insert_with(Vec::new).extend(kept);
            }
        }

        if let Some(score) = result.usefulness_score {
            self.usefulness_score = Some(score.min(100));
        }

        if let Some(fields) = result.custom_fields {
            let merged = self.custom_fields.get_or_insert_with(Map::new);
            for (key, value) in fields {
                merged.insert(key, value);
            }
        }
    }

    /// Produce the enriched record, copying the original untouched
    pub fn finish(self, bookmark: &BookmarkRecord) -> EnrichedBookmarkRecord {
        EnrichedBookmarkRecord {
            bookmark: bookmark.clone(),
            categories: self.categories,
            usefulness_score: self.usefulness_score,
            custom_analysis: self.custom_fields,
        }
    }
}
