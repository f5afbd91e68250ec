//! Generation backends for FitCoach
//!
//! Every backend implements [`LlmClient`]. Retrying is not a backend concern:
//! callers wrap a client in a [`ResilientClient`] carrying an explicit
//! [`RetryPolicy`].

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod openai;
mod retry;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use retry::{ResilientClient, RetryPolicy};
pub use types::{CompletionRequest, CompletionResponse, TokenUsage};

use crate::config::LlmConfig;

/// Create a generation client for the provider named in config
///
/// Supports "gemini" and "openai".
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: gemini, openai",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
