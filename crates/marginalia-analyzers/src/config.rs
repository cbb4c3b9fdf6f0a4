//! Configuration for the built-in analyzers

use crate::prompt::{DEFAULT_CATEGORIZE_TEMPLATE, DEFAULT_SCORE_TEMPLATE};
use marginalia_domain::ScoringMethod;
use serde::{Deserialize, Serialize};

/// Configuration for the LLM categorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizerConfig {
    /// Prompt with `{text}`, `{author}` and `{maxCategories}` placeholders
    #[serde(default = "default_categorize_template")]
    pub prompt_template: String,

    /// Upper bound on categories kept per bookmark
    #[serde(default = "default_max_categories")]
    pub max_categories: usize,
}

fn default_categorize_template() -> String {
    DEFAULT_CATEGORIZE_TEMPLATE.to_string()
}

fn default_max_categories() -> usize {
    5
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            prompt_template: default_categorize_template(),
            max_categories: default_max_categories(),
        }
    }
}

impl CategorizerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_categories == 0 {
            return Err("max_categories must be at least 1".to_string());
        }
        if !self.prompt_template.contains("{text}") {
            return Err("prompt_template must contain a {text} placeholder".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}

/// Relative weights of the heuristic signals
///
/// Weights are normalized by their sum, so they need not add up to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Likes, reposts and replies
    pub engagement: f64,

    /// How recently the post was created
    pub recency: f64,

    /// Text length as a proxy for substance
    #[serde(alias = "contentQuality")]
    pub content_quality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            engagement: 0.5,
            recency: 0.3,
            content_quality: 0.2,
        }
    }
}

impl ScoringWeights {
    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.engagement + self.recency + self.content_quality
    }

    /// Validate the weights
    pub fn validate(&self) -> Result<(), String> {
        for (name, weight) in [
            ("engagement", self.engagement),
            ("recency", self.recency),
            ("content_quality", self.content_quality),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("weight '{}' must be a non-negative number", name));
            }
        }
        if self.total() <= 0.0 {
            return Err("at least one scoring weight must be positive".to_string());
        }
        Ok(())
    }
}

/// Configuration for the usefulness scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Scoring method; `none` is not a valid scorer method
    #[serde(default = "default_method")]
    pub method: ScoringMethod,

    /// Heuristic signal weights
    #[serde(default)]
    pub weights: ScoringWeights,

    /// Age at which the recency signal halves (days)
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f64,

    /// Weighted interaction count treated as maximal engagement
    #[serde(default = "default_saturation")]
    pub engagement_saturation: f64,

    /// Text length treated as maximal content quality (characters)
    #[serde(default = "default_ideal_length")]
    pub ideal_length_chars: usize,

    /// Prompt for the llm and hybrid methods
    #[serde(default = "default_score_template")]
    pub prompt_template: String,

    /// Fixed "now" for recency (RFC 3339); the scorer pins the current
    /// time at construction when this is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<String>,
}

fn default_method() -> ScoringMethod {
    ScoringMethod::Heuristic
}

fn default_half_life() -> f64 {
    30.0
}

fn default_saturation() -> f64 {
    10_000.0
}

fn default_ideal_length() -> usize {
    280
}

fn default_score_template() -> String {
    DEFAULT_SCORE_TEMPLATE.to_string()
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            weights: ScoringWeights::default(),
            recency_half_life_days: default_half_life(),
            engagement_saturation: default_saturation(),
            ideal_length_chars: default_ideal_length(),
            prompt_template: default_score_template(),
            reference_time: None,
        }
    }
}

impl ScorerConfig {
    /// Heuristic scorer with the given weights
    pub fn heuristic(weights: ScoringWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.method == ScoringMethod::None {
            return Err("scorer method must be heuristic, llm or hybrid".to_string());
        }
        self.validate_heuristic()
    }

    /// Validate only the parameters the heuristic signals depend on
    pub fn validate_heuristic(&self) -> Result<(), String> {
        self.weights.validate()?;
        if !(self.recency_half_life_days > 0.0) {
            return Err("recency_half_life_days must be greater than 0".to_string());
        }
        if !(self.engagement_saturation > 0.0) {
            return Err("engagement_saturation must be greater than 0".to_string());
        }
        if self.ideal_length_chars == 0 {
            return Err("ideal_length_chars must be greater than 0".to_string());
        }
        if let Some(reference) = &self.reference_time {
            chrono::DateTime::parse_from_rfc3339(reference)
                .map_err(|e| format!("reference_time is not RFC 3339: {}", e))?;
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}
