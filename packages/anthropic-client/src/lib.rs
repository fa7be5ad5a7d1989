//! Pure Anthropic REST API client
//!
//! A minimal client for the Anthropic messages API with no domain-specific
//! logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use anthropic_client::{AnthropicClient, InputMessage, MessagesRequest};
//!
//! let client = AnthropicClient::new(api_key).with_timeout(Duration::from_secs(120))?;
//!
//! let response = client.messages(
//!     MessagesRequest::new("claude-3-5-sonnet-20240620")
//!         .system("You are a helpful assistant.")
//!         .message(InputMessage::user("Hello!"))
//!         .max_tokens(500),
//! ).await?;
//! println!("{}", response.text);
//! ```

pub mod error;
pub mod types;

pub use error::{AnthropicError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// API version header sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Pure Anthropic API client.
#[derive(Clone)]
pub struct AnthropicClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Set a custom base URL (for proxies, gateways, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AnthropicError::Config(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(self)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a message.
    ///
    /// Returns the first text block of the completion.
    pub async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Anthropic request failed");
                AnthropicError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Anthropic API error");
            return Err(AnthropicError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: types::MessagesResponseRaw = response
            .json()
            .await
            .map_err(|e| AnthropicError::Parse(e.to_string()))?;

        let text = raw
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Unsupported => None,
            })
            .ok_or_else(|| AnthropicError::Api {
                status: status.as_u16(),
                message: "No text content from Anthropic".into(),
            })?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "Anthropic message"
        );

        Ok(MessagesResponse {
            text,
            stop_reason: raw.stop_reason,
            usage: raw.usage,
        })
    }
}
