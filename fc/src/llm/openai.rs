//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for the Chat Completions API, or any
//! server that speaks it.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::retry_after_header;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = Vec::new();
        if !request.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system_prompt,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt,
        }));

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // Reasoning models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = self.build_request_body(&request);

        let response = self.http.post(url).bearer_auth(&self.api_key).json(&body).send().await?;
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = retry_after_header(response.headers());
            debug!(?retry_after, "complete: rate limited");
            return Err(LlmError::RateLimited { retry_after });
        }

        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message });
        }

        debug!("complete: success");
        let api_response: OpenAIResponse = response.json().await?;
        Ok(parse_response(api_response))
    }
}

fn parse_response(api_response: OpenAIResponse) -> CompletionResponse {
    let content = api_response.choices.into_iter().next().and_then(|c| c.message.content);
    let usage = api_response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    CompletionResponse { content, usage }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str, max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: model.to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            max_tokens,
        }
    }

    #[test]
    fn test_build_request_body_basic() {
        let mut request = CompletionRequest::new("Hello", 0.7, 1000);
        request.system_prompt = "You are helpful".to_string();

        let body = client("gpt-4o", 8192).build_request_body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_build_request_body_without_system() {
        let body = client("gpt-4o", 8192).build_request_body(&CompletionRequest::new("Hi", 0.3, 10));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_max_tokens_capped() {
        let body = client("gpt-4o", 1000).build_request_body(&CompletionRequest::new("Test", 0.3, 5000));
        assert_eq!(body["max_tokens"], 1000);

        let body = client("o3-mini", 1000).build_request_body(&CompletionRequest::new("Test", 0.3, 500));
        assert_eq!(body["max_completion_tokens"], 500);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_response() {
        let api: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"Eat more beans."}}],
                "usage":{"prompt_tokens":12,"completion_tokens":4}}"#,
        )
        .unwrap();
        let resp = parse_response(api);
        assert_eq!(resp.content.as_deref(), Some("Eat more beans."));
        assert_eq!(resp.usage.input_tokens, 12);
    }
}
