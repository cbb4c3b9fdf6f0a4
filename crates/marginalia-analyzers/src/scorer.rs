//! Usefulness scorer combining the heuristic with an optional LLM opinion

use crate::config::ScorerConfig;
use crate::heuristic::HeuristicScorer;
use crate::parser::extract_first_integer;
use crate::prompt::PromptTemplate;
use async_trait::async_trait;
use marginalia_domain::{AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord, ScoringMethod};
use marginalia_llm::DynProvider;
use tracing::{debug, warn};

/// Scores bookmarks in `0..=100` using the configured [`ScoringMethod`]
///
/// The LLM path never fails a bookmark: any provider or parse failure falls
/// back to the heuristic score.
pub struct UsefulnessScorer {
    method: ScoringMethod,
    heuristic: HeuristicScorer,
    provider: Option<DynProvider>,
    template: PromptTemplate,
}

impl UsefulnessScorer {
    /// Create a scorer; `llm` and `hybrid` require a provider
    pub fn new(config: ScorerConfig, provider: Option<DynProvider>) -> Result<Self, String> {
        config.validate()?;
        if config.method.uses_llm() && provider.is_none() {
            return Err(format!(
                "scoring method '{}' requires an LLM provider",
                config.method
            ));
        }

        Ok(Self {
            method: config.method,
            heuristic: HeuristicScorer::new(&config)?,
            provider,
            template: PromptTemplate::new(config.prompt_template),
        })
    }

    /// Heuristic-only scorer
    pub fn heuristic(config: ScorerConfig) -> Result<Self, String> {
        Self::new(
            ScorerConfig {
                method: ScoringMethod::Heuristic,
                ..config
            },
            None,
        )
    }

    /// The method used for every score
    pub fn method(&self) -> ScoringMethod {
        self.method
    }

    /// Score one bookmark
    pub async fn score(&self, bookmark: &BookmarkRecord) -> u8 {
        let heuristic = self.heuristic.score(bookmark);

        match self.method {
            ScoringMethod::Llm => self.llm_score(bookmark).await.unwrap_or(heuristic),
            ScoringMethod::Hybrid => {
                let llm = self.llm_score(bookmark).await.unwrap_or(heuristic);
                ((f64::from(heuristic) + f64::from(llm)) / 2.0).round() as u8
            }
            ScoringMethod::Heuristic | ScoringMethod::None => heuristic,
        }
    }

    async fn llm_score(&self, bookmark: &BookmarkRecord) -> Option<u8> {
        let provider = self.provider.as_ref()?;
        let prompt = self.template.render(bookmark, None);

        let response = match provider.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "LLM scoring failed for bookmark {} ({}), using heuristic: {}",
                    bookmark.id,
                    provider.name(),
                    e
                );
                return None;
            }
        };

        match extract_first_integer(&response) {
            Some(value) => {
                let score = value.clamp(0, 100) as u8;
                debug!("LLM score for bookmark {}: {}", bookmark.id, score);
                Some(score)
            }
            None => {
                warn!(
                    "LLM score response for bookmark {} has no integer, using heuristic",
                    bookmark.id
                );
                None
            }
        }
    }
}

#[async_trait]
impl Analyzer for UsefulnessScorer {
    fn name(&self) -> &str {
        "usefulness-scorer"
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        Ok(AnalysisResult::with_score(self.score(bookmark).await))
    }
}
