//! Shared HTTP send loop with exponential backoff

use crate::LlmError;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to try a request and how long to wait in between
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
        }
    }

    /// Exponential backoff: base, 2x base, 4x base, ...
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Send the request built by `build`, retrying transient failures
///
/// Transport errors, 429 and 5xx are retried. Authentication failures,
/// unknown models and other 4xx responses return immediately.
pub(crate) async fn send_with_retry<F>(
    policy: RetryPolicy,
    model: &str,
    build: F,
) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < policy.max_attempts {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        return Err(LlmError::Authentication(format!("HTTP {}: {}", status, body)));
                    }
                    StatusCode::NOT_FOUND => {
                        return Err(LlmError::ModelNotAvailable(model.to_string()));
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        last_error = Some(LlmError::RateLimitExceeded);
                    }
                    s if s.is_server_error() => {
                        last_error = Some(LlmError::Communication(format!("HTTP {}: {}", status, body)));
                    }
                    _ => {
                        return Err(LlmError::Communication(format!("HTTP {}: {}", status, body)));
                    }
                }
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < policy.max_attempts {
            let delay = policy.delay_for(attempts);
            warn!(
                "LLM request attempt {}/{} failed, retrying in {:?}",
                attempts, policy.max_attempts, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    debug!("LLM request gave up after {} attempts", attempts);
    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}
