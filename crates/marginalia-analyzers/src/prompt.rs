//! Prompt templates for LLM-backed analyzers

use marginalia_domain::BookmarkRecord;

/// Default categorization prompt
pub const DEFAULT_CATEGORIZE_TEMPLATE: &str = r#"Categorize the following saved social media post into at most {maxCategories} short topical categories.

Post by @{author}:
---
{text}
---

Rules:
- Use lowercase category names of one to three words
- Prefer broad, reusable topics ("machine learning", "web development", "cooking")
- Do not invent categories unrelated to the text

Respond with a JSON array of category names only, for example ["machine learning", "python"]."#;

/// Default usefulness prompt
pub const DEFAULT_SCORE_TEMPLATE: &str = r#"Rate how useful the following saved social media post is as a reference to come back to later, on a scale from 0 (no lasting value) to 100 (essential reference).

Post by @{author}:
---
{text}
---

Respond with a single integer between 0 and 100 and nothing else."#;

/// A prompt with `{placeholder}` slots
///
/// Supported placeholders: `{text}`, `{author}`, `{url}`, `{maxCategories}`.
/// Unknown placeholders are left as written.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wrap a template string
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the template for one bookmark
    pub fn render(&self, bookmark: &BookmarkRecord, max_categories: Option<usize>) -> String {
        let mut prompt = self
            .template
            .replace("{author}", &bookmark.author_username)
            .replace("{url}", &bookmark.url);

        if let Some(max) = max_categories {
            prompt = prompt.replace("{maxCategories}", &max.to_string());
        }

        // Text goes last so placeholders inside the post body are not expanded
        prompt.replace("{text}", &bookmark.text)
    }

    /// The raw template
    pub fn as_str(&self) -> &str {
        &self.template
    }
}
