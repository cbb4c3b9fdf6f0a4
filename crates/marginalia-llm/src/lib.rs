//! Marginalia LLM Provider Layer
//!
//! Pluggable chat-completion clients behind the `LlmProvider` trait from
//! `marginalia-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OpenAiProvider`: OpenAI-shaped `/v1/chat/completions` API
//! - `AnthropicProvider`: Anthropic-shaped `/v1/messages` API
//!
//! # Examples
//!
//! ```
//! use marginalia_llm::MockProvider;
//! use marginalia_domain::LlmProvider;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new("tech, programming");
//! let result = provider.generate("categorize this").await.unwrap();
//! assert_eq!(result, "tech, programming");
//! # }
//! ```

#![warn(missing_docs)]

pub mod anthropic;
pub mod config;
pub mod openai;
mod retry;

use async_trait::async_trait;
use marginalia_domain::LlmProvider as LlmProviderTrait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicProvider;
pub use config::{ProviderConfig, ProviderKind};
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Shared, dynamically chosen provider
pub type DynProvider = Arc<dyn LlmProviderTrait<Error = LlmError>>;

/// Build the provider selected by `config`
pub fn build_provider(config: &ProviderConfig) -> Result<DynProvider, LlmError> {
    config.validate().map_err(LlmError::Config)?;

    let provider: DynProvider = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_config(config)?),
    };
    Ok(provider)
}

const ERROR_SENTINEL: &str = "ERROR";

/// Mock LLM provider for deterministic testing
///
/// Resolution order for each call: a queued response (FIFO), then a
/// response registered for the exact prompt, then the default response.
///
/// # Examples
///
/// ```
/// use marginalia_llm::MockProvider;
/// use marginalia_domain::LlmProvider;
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.queue_response("first call");
///
/// assert_eq!(provider.generate("prompt1").await.unwrap(), "first call");
/// assert_eq!(provider.generate("prompt1").await.unwrap(), "response1");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    queue: Arc<Mutex<VecDeque<String>>>,
    call_count: Arc<Mutex<usize>>,
    latency: Option<Duration>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
            latency: None,
        }
    }

    /// Create a provider that fails every call
    pub fn failing() -> Self {
        Self::new(ERROR_SENTINEL)
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(prompt.into(), response.into());
        }
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        self.add_response(prompt, ERROR_SENTINEL);
    }

    /// Queue a response for the next unmatched call
    pub fn queue_response(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response.into());
        }
    }

    /// Queue an error for the next call
    pub fn queue_error(&self) {
        self.queue_response(ERROR_SENTINEL);
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|count| *count).unwrap_or(0)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        if let Ok(mut count) = self.call_count.lock() {
            *count = 0;
        }
    }

    fn resolve(&self, prompt: &str) -> String {
        if let Some(queued) = self.queue.lock().ok().and_then(|mut q| q.pop_front()) {
            return queued;
        }
        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(prompt).cloned())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        if let Ok(mut count) = self.call_count.lock() {
            *count += 1;
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let response = self.resolve(prompt);
        if response == ERROR_SENTINEL {
            return Err(LlmError::Other("Mock error".to_string()));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").await.unwrap(), "world");
        assert_eq!(provider.generate("foo").await.unwrap(), "bar");
        assert_eq!(provider.generate("unknown").await.unwrap(), "Default mock response");
    }

    #[tokio::test]
    async fn test_mock_provider_queue_is_fifo() {
        let provider = MockProvider::new("fallback");
        provider.queue_response("one");
        provider.queue_response("two");

        assert_eq!(provider.generate("p").await.unwrap(), "one");
        assert_eq!(provider.generate("p").await.unwrap(), "two");
        assert_eq!(provider.generate("p").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").await.unwrap();
        provider.generate("prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.generate("bad prompt").await;
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));

        provider.queue_error();
        assert!(provider.generate("fine").await.is_err());
        assert!(MockProvider::failing().generate("x").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_build_provider_rejects_invalid_config() {
        let config = ProviderConfig {
            model: String::new(),
            ..ProviderConfig::default()
        };
        assert!(matches!(build_provider(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_build_provider_selects_kind() {
        let config = ProviderConfig {
            kind: ProviderKind::Anthropic,
            api_key: Some("key".to_string()),
            ..ProviderConfig::default()
        };
        let provider = build_provider(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
