//! Request/response types shared by all generation backends

/// A completion request - everything needed for one generation call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system instruction; prompts built by the composer carry
    /// their instructions inline and leave this empty
    pub system_prompt: String,

    /// The complete user prompt
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Max tokens for response (capped by the backend's configured limit)
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Create a request with no system instruction
    pub fn new(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system_prompt: String::new(),
            prompt: prompt.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Token usage, when the backend reports it
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage for cost tracking
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
