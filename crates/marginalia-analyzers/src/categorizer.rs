//! LLM-backed topical categorization

use crate::config::CategorizerConfig;
use crate::parser::parse_categories;
use crate::prompt::PromptTemplate;
use async_trait::async_trait;
use marginalia_domain::{AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord};
use marginalia_llm::DynProvider;
use tracing::{debug, warn};

/// Category assigned when no real category could be determined
pub const UNCATEGORIZED: &str = "uncategorized";

/// Asks a language model which topics a bookmark belongs to
///
/// Always produces a non-empty category list.
pub struct LlmCategorizer {
    provider: DynProvider,
    template: PromptTemplate,
    max_categories: usize,
}

impl LlmCategorizer {
    /// Create a categorizer
    pub fn new(provider: DynProvider, config: CategorizerConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            provider,
            template: PromptTemplate::new(config.prompt_template),
            max_categories: config.max_categories,
        })
    }

    /// Categorize one bookmark
    pub async fn categorize(&self, bookmark: &BookmarkRecord) -> Vec<String> {
        if bookmark.text.trim().is_empty() {
            debug!("Bookmark {} has no text, skipping LLM", bookmark.id);
            return fallback();
        }

        let prompt = self.template.render(bookmark, Some(self.max_categories));
        let response = match self.provider.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Categorization failed for bookmark {} ({}): {}",
                    bookmark.id,
                    self.provider.name(),
                    e
                );
                return fallback();
            }
        };

        let categories = parse_categories(&response, self.max_categories);
        if categories.is_empty() {
            warn!(
                "No categories parsed for bookmark {} from response: {:?}",
                bookmark.id, response
            );
            return fallback();
        }

        debug!("Bookmark {} categorized as {:?}", bookmark.id, categories);
        categories
    }
}

fn fallback() -> Vec<String> {
    vec![UNCATEGORIZED.to_string()]
}

#[async_trait]
impl Analyzer for LlmCategorizer {
    fn name(&self) -> &str {
        "llm-categorizer"
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        Ok(AnalysisResult::with_categories(self.categorize(bookmark).await))
    }
}
