//! Marginalia Analyzers
//!
//! Built-in implementations of the `Analyzer` trait.
//!
//! # Analyzers
//!
//! - [`LlmCategorizer`]: asks a language model for topical categories
//! - [`UsefulnessScorer`]: 0-100 usefulness score (heuristic, llm or hybrid)
//! - [`KeywordSentimentAnalyzer`]: local lexicon-based sentiment in `customFields`
//!
//! LLM-backed analyzers never fail a bookmark: the categorizer falls back to
//! `["uncategorized"]` and the scorer falls back to its heuristic score.
//!
//! # Example
//!
//! ```
//! use marginalia_analyzers::{LlmCategorizer, CategorizerConfig};
//! use marginalia_llm::MockProvider;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(MockProvider::new(r#"["rust", "programming"]"#));
//! let categorizer = LlmCategorizer::new(provider, CategorizerConfig::default()).unwrap();
//! ```

#![warn(missing_docs)]

mod categorizer;
mod config;
mod heuristic;
mod parser;
mod prompt;
mod scorer;
mod sentiment;

pub use categorizer::{LlmCategorizer, UNCATEGORIZED};
pub use config::{CategorizerConfig, ScorerConfig, ScoringWeights};
pub use heuristic::HeuristicScorer;
pub use parser::{extract_first_integer, parse_categories};
pub use prompt::PromptTemplate;
pub use scorer::UsefulnessScorer;
pub use sentiment::KeywordSentimentAnalyzer;
