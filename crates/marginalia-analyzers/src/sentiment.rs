//! Local keyword-based sentiment

use async_trait::async_trait;
use marginalia_domain::{AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord};
use serde_json::{json, Map};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "awesome", "fantastic", "wonderful", "love", "best",
    "perfect", "brilliant", "outstanding", "superb", "incredible", "helpful", "useful", "valuable",
    "important", "interesting", "insightful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "poor", "disappointing", "hate", "useless",
    "broken", "failed", "error", "problem", "issue", "bug", "difficult", "confusing", "complicated",
    "frustrating", "annoying",
];

/// Scores above this are positive, below its negation negative
const LABEL_THRESHOLD: f64 = 0.2;

/// Counts lexicon hits and reports `sentiment` and `sentimentScore` as
/// custom fields
#[derive(Debug, Clone, Default)]
pub struct KeywordSentimentAnalyzer;

impl KeywordSentimentAnalyzer {
    /// Create the analyzer
    pub fn new() -> Self {
        Self
    }

    /// Label and score in `-1.0..=1.0`, rounded to two decimals
    pub fn classify(&self, text: &str) -> (&'static str, f64) {
        let lowered = text.to_lowercase();
        let words = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty());
        let (positive, negative) = words.fold((0u32, 0u32), |(pos, neg), word| {
            if POSITIVE_WORDS.contains(&word) {
                (pos + 1, neg)
            } else if NEGATIVE_WORDS.contains(&word) {
                (pos, neg + 1)
            } else {
                (pos, neg)
            }
        });

        let hits = positive + negative;
        if hits == 0 {
            return ("neutral", 0.0);
        }

        let score = (f64::from(positive) - f64::from(negative)) / f64::from(hits);
        let label = if score > LABEL_THRESHOLD {
            "positive"
        } else if score < -LABEL_THRESHOLD {
            "negative"
        } else {
            "neutral"
        };
        (label, (score * 100.0).round() / 100.0)
    }
}

#[async_trait]
impl Analyzer for KeywordSentimentAnalyzer {
    fn name(&self) -> &str {
        "keyword-sentiment"
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        let (label, score) = self.classify(&bookmark.text);

        let mut fields = Map::new();
        fields.insert("sentiment".to_string(), json!(label));
        fields.insert("sentimentScore".to_string(), json!(score));
        Ok(AnalysisResult::with_custom_fields(fields))
    }
}
