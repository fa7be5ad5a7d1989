//! Anthropic messages API request and response types.

use serde::{Deserialize, Serialize};

/// Messages API request.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    /// Model to use (e.g., "claude-3-5-sonnet-20240620")
    pub model: String,

    /// Maximum tokens in the completion (required by the API)
    pub max_tokens: u32,

    /// Top-level system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Conversation turns
    pub messages: Vec<InputMessage>,

    /// Sampling temperature (0.0 to 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl MessagesRequest {
    /// Default completion cap when none is set.
    pub const DEFAULT_MAX_TOKENS: u32 = 1024;

    /// Create a new request with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            system: None,
            messages: Vec::new(),
            temperature: None,
        }
    }

    /// Set the system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Add a conversation turn.
    pub fn message(mut self, message: InputMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMessage {
    /// Role, always "user" for evaluation requests
    pub role: String,

    /// Content blocks
    pub content: Vec<ContentBlock>,
}

impl InputMessage {
    /// Create a user turn with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// A content block in a request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// Any block type this client does not model (tool_use, thinking, ...)
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Messages API response.
#[derive(Debug, Clone)]
pub struct MessagesResponse {
    /// First text block of the completion
    pub text: String,

    /// Why generation stopped ("end_turn", "max_tokens", ...)
    pub stop_reason: Option<String>,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Raw response from API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponseRaw {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
