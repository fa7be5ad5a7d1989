//! Model client contract and provider adapters.
//!
//! The evaluator only ever sees [`ModelClient`]. Each provider adapter turns a
//! system prompt and a user prompt into one chat request; [`Retrying`] wraps
//! any adapter with the shared backoff policy.

mod claude;
mod openai;
mod retry;

pub use claude::{ClaudeModel, DEFAULT_CLAUDE_MODEL};
pub use openai::{OpenAiModel, DEFAULT_OPENAI_MODEL};
pub use retry::{RetryPolicy, Retrying};

use async_trait::async_trait;

use crate::error::ProviderError;

/// Sampling temperature sent with every evaluation request.
pub const TEMPERATURE: f32 = 0.0;

/// Completion token cap sent with every evaluation request.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

/// A remote LLM that answers a system + user prompt with raw text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one chat request and return the primary text completion.
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError>;

    /// Short provider label used in logs and errors.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<C: ModelClient + ?Sized> ModelClient for std::sync::Arc<C> {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        (**self).call(system_prompt, user_prompt).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
