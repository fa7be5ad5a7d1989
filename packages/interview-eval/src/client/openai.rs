use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, ResponseFormat};
use tracing::{info, warn};

use super::{ModelClient, MAX_OUTPUT_TOKENS, TEMPERATURE};
use crate::error::ProviderError;

const PROVIDER: &str = "openai";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-2024-08-06";

/// [`ModelClient`] backed by OpenAI chat completions.
///
/// Requests JSON-object output when the model supports it and free text
/// otherwise (fine-tuned checkpoints).
#[derive(Clone)]
pub struct OpenAiModel {
    client: OpenAIClient,
    model: String,
}

impl OpenAiModel {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system_prompt: &str, user_prompt: &str) -> ChatRequest {
        ChatRequest::new(&self.model)
            .message(Message::system(system_prompt))
            .message(Message::user(user_prompt))
            .temperature(TEMPERATURE)
            .token_limit(MAX_OUTPUT_TOKENS)
            .response_format(ResponseFormat::for_model(&self.model))
    }
}

#[async_trait]
impl ModelClient for OpenAiModel {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let start = std::time::Instant::now();

        match self
            .client
            .chat_completion(self.request(system_prompt, user_prompt))
            .await
        {
            Ok(response) => {
                info!(
                    provider = PROVIDER,
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis(),
                    "API call completed"
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!(
                    provider = PROVIDER,
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis(),
                    error = %e,
                    "OpenAI API error"
                );
                Err(ProviderError::request(PROVIDER, e))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_json_mode_for_base_model() {
        let model = OpenAiModel::new(OpenAIClient::new("sk-test"), DEFAULT_OPENAI_MODEL);
        let request = model.request("sys", "usr");

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].content, "usr");
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(2000));
        assert_eq!(request.response_format, Some(ResponseFormat::json_object()));
    }

    #[test]
    fn test_request_uses_text_mode_for_fine_tuned_model() {
        let model = OpenAiModel::new(
            OpenAIClient::new("sk-test"),
            "ft:gpt-4o-2024-08-06:acme:interview-eval:ckpt-430",
        );
        let request = model.request("sys", "usr");

        assert_eq!(request.response_format, Some(ResponseFormat::text()));
    }
}
