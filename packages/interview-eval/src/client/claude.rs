use anthropic_client::{AnthropicClient, InputMessage, MessagesRequest};
use async_trait::async_trait;
use tracing::{info, warn};

use super::{ModelClient, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::error::ProviderError;

const PROVIDER: &str = "claude";

/// Default Claude model.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20240620";

/// [`ModelClient`] backed by the Anthropic messages API.
#[derive(Clone)]
pub struct ClaudeModel {
    client: AnthropicClient,
    model: String,
}

impl ClaudeModel {
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system_prompt: &str, user_prompt: &str) -> MessagesRequest {
        MessagesRequest::new(&self.model)
            .system(system_prompt)
            .message(InputMessage::user(user_prompt))
            .temperature(TEMPERATURE)
            .max_tokens(MAX_OUTPUT_TOKENS)
    }
}

#[async_trait]
impl ModelClient for ClaudeModel {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let start = std::time::Instant::now();

        match self
            .client
            .messages(self.request(system_prompt, user_prompt))
            .await
        {
            Ok(response) => {
                info!(
                    provider = PROVIDER,
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis(),
                    stop_reason = response.stop_reason.as_deref().unwrap_or("unknown"),
                    "API call completed"
                );
                Ok(response.text)
            }
            Err(e) => {
                warn!(
                    provider = PROVIDER,
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis(),
                    error = %e,
                    "Claude API error"
                );
                Err(ProviderError::request(PROVIDER, e))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
