//! Bounded retry around a generation client

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::{CompletionRequest, LlmClient, LlmError};

/// Retry policy for generation calls
///
/// The wait after failed attempt `n` (1-based) is
/// `multiplier * 2^(n-1)` seconds, clamped to `[min_wait, max_wait]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Which errors are worth another attempt
    pub retryable: fn(&LlmError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: 2.0,
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
            retryable: LlmError::is_rate_limit,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries rate limits without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Wait before the attempt following failed attempt `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        let secs = (self.multiplier * exp)
            .min(self.max_wait.as_secs_f64())
            .max(self.min_wait.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.max_wait)
    }

    pub fn should_retry(&self, error: &LlmError, attempt: u32) -> bool {
        attempt < self.max_attempts && (self.retryable)(error)
    }
}

/// A generation client that retries according to a [`RetryPolicy`]
///
/// This is the only place generation calls are retried.
#[derive(Clone)]
pub struct ResilientClient {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
    temperature: f32,
    structured_temperature: f32,
    max_tokens: u32,
}

impl ResilientClient {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            temperature: 0.7,
            structured_temperature: 0.3,
            max_tokens: 8192,
        }
    }

    /// Override sampling settings
    pub fn with_sampling(mut self, temperature: f32, structured_temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.structured_temperature = structured_temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate free text
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.run(CompletionRequest::new(prompt, self.temperature, self.max_tokens))
            .await
    }

    /// Generate output that is expected to parse as JSON
    pub async fn generate_structured(&self, prompt: &str) -> Result<String, LlmError> {
        self.run(CompletionRequest::new(prompt, self.structured_temperature, self.max_tokens))
            .await
    }

    async fn run(&self, request: CompletionRequest) -> Result<String, LlmError> {
        debug!(prompt_len = request.prompt.len(), "run: called");
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.complete(request.clone()).await {
                Ok(response) => {
                    let text = response
                        .content
                        .ok_or_else(|| LlmError::InvalidResponse("Empty completion".to_string()))?;
                    debug!(attempt, output_tokens = response.usage.output_tokens, "run: success");
                    return Ok(text.trim_end_matches('\n').to_string());
                }
                Err(e) if self.policy.should_retry(&e, attempt) => {
                    let wait = self.policy.backoff(attempt);
                    warn!(attempt, wait_ms = wait.as_millis() as u64, server_hint = ?e.retry_after(), "run: rate limited, backing off");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    if (self.policy.retryable)(&e) {
                        error!(attempt, error = %e, "run: giving up after final attempt");
                    } else {
                        debug!(attempt, error = %e, "run: non-retryable error");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::{MockLlmClient, Scripted, text};
    use proptest::prelude::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=7).map(|n| policy.backoff(n).as_secs()).collect();
        assert_eq!(waits, vec![2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_backoff_clamps_to_min() {
        let policy = RetryPolicy {
            multiplier: 0.1,
            ..Default::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
    }

    proptest! {
        #[test]
        fn backoff_is_non_decreasing_and_capped(attempt in 1u32..64) {
            let policy = RetryPolicy::default();
            let current = policy.backoff(attempt);
            let next = policy.backoff(attempt + 1);
            prop_assert!(next >= current);
            prop_assert!(next <= Duration::from_secs(60));
            prop_assert!(current >= Duration::from_secs(2));
        }
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let mock = Arc::new(MockLlmClient::new(vec![
            Scripted::RateLimited,
            Scripted::RateLimited,
            text("Done\n\n"),
        ]));
        let client = ResilientClient::new(mock.clone(), RetryPolicy::immediate(5));

        let out = client.generate("hi").await.unwrap();
        assert_eq!(out, "Done");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = Arc::new(MockLlmClient::new((0..6).map(|_| Scripted::RateLimited).collect()));
        let client = ResilientClient::new(mock.clone(), RetryPolicy::immediate(5));

        let err = client.generate("hi").await.unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(mock.call_count(), 5);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let mock = Arc::new(MockLlmClient::new(vec![Scripted::Fatal(500), text("never reached")]));
        let client = ResilientClient::new(mock.clone(), RetryPolicy::immediate(5));

        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { status: 500, .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_only_trailing_newlines_stripped() {
        let mock = Arc::new(MockLlmClient::new(vec![text("\nline one\nline two\n")]));
        let client = ResilientClient::new(mock, RetryPolicy::immediate(1));
        assert_eq!(client.generate_structured("hi").await.unwrap(), "\nline one\nline two");
    }
}
