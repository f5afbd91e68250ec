//! Google Gemini client implementation
//!
//! Implements the LlmClient trait for the `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::retry_after_header;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
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

    /// The key travels in a header so request URLs never carry it
    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request_body(&self, request: &CompletionRequest) -> GeminiRequest {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: if request.system_prompt.is_empty() {
                None
            } else {
                Some(GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: request.system_prompt.clone(),
                    }],
                })
            },
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens.min(self.max_tokens),
            },
        }
    }
}

/// Gemini reports quota exhaustion as 429 or as a RESOURCE_EXHAUSTED status
fn is_quota_exhausted(status: u16, body: &str) -> bool {
    status == 429 || body.contains("RESOURCE_EXHAUSTED")
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, prompt_len = request.prompt.len(), "complete: called");
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let retry_after = retry_after_header(response.headers());

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            if is_quota_exhausted(status, &text) {
                debug!(%status, "complete: quota exhausted");
                return Err(LlmError::RateLimited { retry_after });
            }
            debug!(%status, "complete: API error");
            return Err(LlmError::ApiError { status, message: text });
        }

        let parsed: GeminiResponse = response.json().await?;
        parse_response(parsed)
    }
}

fn parse_response(parsed: GeminiResponse) -> Result<CompletionResponse, LlmError> {
    if let Some(error) = parsed.error {
        if error.status.as_deref() == Some("RESOURCE_EXHAUSTED") {
            return Err(LlmError::RateLimited {
                retry_after: Duration::ZERO,
            });
        }
        return Err(LlmError::ApiError {
            status: error.code.unwrap_or(0),
            message: error.message,
        });
    }

    let content = parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("No content in response".to_string()))?;

    let usage = parsed
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: Some(content),
        usage,
    })
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    code: Option<u16>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}
