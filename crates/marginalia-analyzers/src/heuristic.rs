//! Deterministic usefulness scoring from engagement, recency and length

use crate::config::{ScorerConfig, ScoringWeights};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marginalia_domain::{AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord};

/// `createdAt` format used by the legacy Twitter API
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Heuristic usefulness scorer
///
/// Each signal is normalized to `0.0..=1.0` and the score is the weighted
/// mean scaled to `0..=100`. Recency is measured against a reference time
/// fixed at construction, so scoring the same bookmark twice yields the same
/// value.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
    half_life_days: f64,
    saturation: f64,
    ideal_length: usize,
    reference_time: DateTime<Utc>,
}

impl HeuristicScorer {
    /// Build a scorer from configuration
    pub fn new(config: &ScorerConfig) -> Result<Self, String> {
        config.validate_heuristic()?;

        let reference_time = match &config.reference_time {
            Some(reference) => DateTime::parse_from_rfc3339(reference)
                .map_err(|e| format!("reference_time is not RFC 3339: {}", e))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };

        Ok(Self {
            weights: config.weights,
            half_life_days: config.recency_half_life_days,
            saturation: config.engagement_saturation,
            ideal_length: config.ideal_length_chars,
            reference_time,
        })
    }

    /// Override the instant recency is measured against
    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Score a bookmark in `0..=100`
    pub fn score(&self, bookmark: &BookmarkRecord) -> u8 {
        let total = self.weights.total();
        if total <= 0.0 {
            return 0;
        }

        let weighted = self.weights.engagement * self.engagement(bookmark)
            + self.weights.recency * self.recency(bookmark)
            + self.weights.content_quality * self.content_quality(bookmark);

        (100.0 * weighted / total).round().clamp(0.0, 100.0) as u8
    }

    /// Log-scaled engagement signal
    pub fn engagement(&self, bookmark: &BookmarkRecord) -> f64 {
        let interactions = bookmark.like_count as f64
            + 2.0 * bookmark.retweet_count as f64
            + 1.5 * bookmark.reply_count as f64;

        ((1.0 + interactions).ln() / (1.0 + self.saturation).ln()).min(1.0)
    }

    /// Exponential decay by age; 0 when `createdAt` cannot be parsed
    pub fn recency(&self, bookmark: &BookmarkRecord) -> f64 {
        let Some(created) = parse_created_at(&bookmark.created_at) else {
            return 0.0;
        };

        let age_secs = (self.reference_time - created).num_seconds().max(0) as f64;
        let age_days = age_secs / SECONDS_PER_DAY;
        0.5_f64.powf(age_days / self.half_life_days)
    }

    /// Text length relative to the ideal length
    pub fn content_quality(&self, bookmark: &BookmarkRecord) -> f64 {
        (bookmark.text.chars().count() as f64 / self.ideal_length as f64).min(1.0)
    }
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl Analyzer for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic-scorer"
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        Ok(AnalysisResult::with_score(self.score(bookmark)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REFERENCE: &str = "2024-06-01T00:00:00Z";

    fn bookmark(likes: u64, created_at: &str, text: &str) -> BookmarkRecord {
        BookmarkRecord {
            id: "1".to_string(),
            url: "https://x.com/a/status/1".to_string(),
            text: text.to_string(),
            author_username: "a".to_string(),
            author_name: "A".to_string(),
            created_at: created_at.to_string(),
            like_count: likes,
            retweet_count: 0,
            reply_count: 0,
            extra: Default::default(),
        }
    }

    fn scorer(weights: ScoringWeights) -> HeuristicScorer {
        let config = ScorerConfig {
            reference_time: Some(REFERENCE.to_string()),
            ..ScorerConfig::heuristic(weights)
        };
        HeuristicScorer::new(&config).unwrap()
    }

    #[test]
    fn test_engagement_only_ranks_by_likes() {
        let scorer = scorer(ScoringWeights {
            engagement: 1.0,
            recency: 0.0,
            content_quality: 0.0,
        });

        let popular = bookmark(1000, REFERENCE, "x");
        let obscure = bookmark(1, REFERENCE, "x");
        assert!(scorer.score(&popular) > scorer.score(&obscure));
    }

    #[test]
    fn test_engagement_saturates() {
        let scorer = scorer(ScoringWeights::default());
        let viral = bookmark(10_000_000, REFERENCE, "x");
        assert_eq!(scorer.engagement(&viral), 1.0);
        assert_eq!(scorer.engagement(&bookmark(0, REFERENCE, "x")), 0.0);
    }

    #[test]
    fn test_recency_halves_per_half_life() {
        let scorer = scorer(ScoringWeights::default());
        let fresh = bookmark(0, REFERENCE, "x");
        let month_old = bookmark(0, "2024-05-02T00:00:00Z", "x");

        assert_eq!(scorer.recency(&fresh), 1.0);
        assert!((scorer.recency(&month_old) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let scorer = scorer(ScoringWeights::default());
        assert_eq!(scorer.recency(&bookmark(0, "2030-01-01T00:00:00Z", "x")), 1.0);
    }

    #[test]
    fn test_twitter_date_format() {
        let scorer = scorer(ScoringWeights::default());
        let legacy = bookmark(0, "Sat Jun 01 00:00:00 +0000 2024", "x");
        assert_eq!(scorer.recency(&legacy), 1.0);
    }

    #[test]
    fn test_unparseable_date_scores_zero_recency() {
        let scorer = scorer(ScoringWeights::default());
        assert_eq!(scorer.recency(&bookmark(0, "last tuesday", "x")), 0.0);
    }

    #[test]
    fn test_content_quality_caps_at_one() {
        let scorer = scorer(ScoringWeights::default());
        assert_eq!(scorer.content_quality(&bookmark(0, REFERENCE, &"a".repeat(500))), 1.0);
        assert!((scorer.content_quality(&bookmark(0, REFERENCE, &"a".repeat(140))) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_perfect_bookmark_scores_100() {
        let scorer = scorer(ScoringWeights::default());
        let best = bookmark(10_000_000, REFERENCE, &"a".repeat(280));
        assert_eq!(scorer.score(&best), 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScorerConfig::heuristic(ScoringWeights {
            engagement: 0.0,
            recency: 0.0,
            content_quality: 0.0,
        });
        assert!(HeuristicScorer::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_analyzer_emits_score_only() {
        let scorer = scorer(ScoringWeights::default());
        let result = scorer.analyze(&bookmark(50, REFERENCE, "hello")).await.unwrap();
        assert!(result.usefulness_score.is_some());
        assert!(result.categories.is_none());
        assert_eq!(scorer.name(), "heuristic-scorer");
    }

    proptest! {
        #[test]
        fn prop_score_in_range_and_deterministic(
            likes in 0u64..100_000_000,
            retweets in 0u64..10_000_000,
            replies in 0u64..10_000_000,
            age_days in -400i64..4000,
            len in 0usize..2000,
            engagement in 0.0f64..10.0,
            recency in 0.0f64..10.0,
            quality in 0.01f64..10.0,
        ) {
            let scorer = scorer(ScoringWeights { engagement, recency, content_quality: quality });
            let created = (scorer.reference_time - chrono::Duration::days(age_days)).to_rfc3339();
            let mut record = bookmark(likes, &created, &"x".repeat(len));
            record.retweet_count = retweets;
            record.reply_count = replies;

            let first = scorer.score(&record);
            prop_assert!(first <= 100);
            prop_assert_eq!(first, scorer.score(&record));
        }
    }
}
