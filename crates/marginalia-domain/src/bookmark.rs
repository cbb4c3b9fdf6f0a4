//! Bookmark records - the unit of work for every analyzer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One saved post as produced by the bookmark exporter
///
/// Records are immutable from the engine's point of view: analysis produces an
/// [`EnrichedBookmarkRecord`] that embeds an untouched copy of this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    /// Opaque identifier, unique within an export
    pub id: String,

    /// Canonical URL of the post
    pub url: String,

    /// Post body
    pub text: String,

    /// Handle of the author (without `@`)
    pub author_username: String,

    /// Display name of the author
    pub author_name: String,

    /// Creation time as supplied by the exporter (ISO-8601, kept verbatim)
    pub created_at: String,

    /// Number of likes
    pub like_count: u64,

    /// Number of reposts
    pub retweet_count: u64,

    /// Number of replies
    pub reply_count: u64,

    /// Exporter fields this crate does not model, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookmarkRecord {
    /// Total raw interaction count across likes, reposts and replies
    pub fn total_engagement(&self) -> u64 {
        self.like_count
            .saturating_add(self.retweet_count)
            .saturating_add(self.reply_count)
    }
}

/// A bookmark plus the fields contributed by analyzers
///
/// The original record is flattened so every input field serializes at the
/// same level and under the same name as it was read. Enrichment fields are
/// omitted from the output when no analyzer supplied them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBookmarkRecord {
    /// The original record, unchanged
    #[serde(flatten)]
    pub bookmark: BookmarkRecord,

    /// Topical categories in analyzer order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    /// Usefulness score in `0..=100`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usefulness_score: Option<u8>,

    /// Arbitrary analyzer-supplied fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_analysis: Option<Map<String, Value>>,
}

impl EnrichedBookmarkRecord {
    /// Wrap a bookmark without any enrichment
    pub fn unenriched(bookmark: BookmarkRecord) -> Self {
        Self {
            bookmark,
            categories: None,
            usefulness_score: None,
            custom_analysis: None,
        }
    }

    /// Bookmark identifier
    pub fn id(&self) -> &str {
        &self.bookmark.id
    }
}

impl From<BookmarkRecord> for EnrichedBookmarkRecord {
    fn from(bookmark: BookmarkRecord) -> Self {
        Self::unenriched(bookmark)
    }
}
