//! Scoring method vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How usefulness scores in an export were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    /// Scores asked of a language model
    Llm,
    /// Deterministic local scoring from engagement, recency and length
    Heuristic,
    /// Mean of the heuristic and language-model scores
    Hybrid,
    /// No scoring configured
    #[default]
    None,
}

impl ScoringMethod {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::Llm => "llm",
            ScoringMethod::Heuristic => "heuristic",
            ScoringMethod::Hybrid => "hybrid",
            ScoringMethod::None => "none",
        }
    }

    /// Whether scoring needs a language model at all
    pub fn uses_llm(&self) -> bool {
        matches!(self, ScoringMethod::Llm | ScoringMethod::Hybrid)
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" => Ok(ScoringMethod::Llm),
            "heuristic" => Ok(ScoringMethod::Heuristic),
            "hybrid" => Ok(ScoringMethod::Hybrid),
            "none" => Ok(ScoringMethod::None),
            other => Err(format!("Unknown scoring method: {}", other)),
        }
    }
}
