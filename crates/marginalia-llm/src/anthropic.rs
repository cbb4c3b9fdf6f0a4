//! Anthropic Provider Implementation
//!
//! Speaks the `/v1/messages` protocol.

use crate::config::ProviderConfig;
use crate::retry::{send_with_retry, RetryPolicy};
use crate::LlmError;
use async_trait::async_trait;
use marginalia_domain::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// API version header value sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages provider
pub struct AnthropicProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
    retry: RetryPolicy,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config.resolved_api_key();
        if api_key.is_none() {
            warn!(
                "No Anthropic API key configured (set api_key or {})",
                config.kind.api_key_env()
            );
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.resolved_endpoint(),
            model: config.model.clone(),
            api_key,
            client,
            retry: RetryPolicy::new(config.max_retries),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Set the delay before the first retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = send_with_retry(self.retry, &self.model, || {
            let request = self
                .client
                .post(&url)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body);
            match &self.api_key {
                Some(key) => request.header("x-api-key", key),
                None => request,
            }
        })
        .await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::InvalidResponse("Response has no text block".to_string()))?;

        debug!("anthropic response length: {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl LlmProviderTrait for AnthropicProvider {
    type Error = LlmError;

    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.complete(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderKind;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ProviderConfig {
        ProviderConfig {
            kind: ProviderKind::Anthropic,
            endpoint: Some(server.uri()),
            model: "claude-3-5-haiku-latest".to_string(),
            api_key: Some("test-key".to_string()),
            ..ProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_reads_first_text_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "content": [{"type": "text", "text": "[\"food\", \"cooking\"]"}]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::from_config(&config_for(&server)).unwrap();
        let text = provider.generate("categorize").await.unwrap();
        assert_eq!(text, "[\"food\", \"cooking\"]");
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.max_retries = 2;
        let provider = AnthropicProvider::from_config(&config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1));

        let err = provider.generate("x").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::from_config(&config_for(&server)).unwrap();
        let err = provider.generate("x").await.unwrap_err();
        assert!(matches!(err, LlmError::ModelNotAvailable(m) if m == "claude-3-5-haiku-latest"));
    }
}
