//! Mock model clients for tests.
//!
//! Lets pipeline tests run without network access or credentials.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::ModelClient;
use crate::error::ProviderError;

const PROVIDER: &str = "mock";

/// Default evaluation returned when nothing else is configured.
pub const DEFAULT_MOCK_EVALUATION: &str = r#"{"expertise":{"score":4,"justification":"mock"}}"#;

type Handler = dyn Fn(&str, &str) -> Result<String, String> + Send + Sync;
type Latency = dyn Fn(&str) -> Duration + Send + Sync;

/// Arguments captured from a model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Scriptable [`ModelClient`].
///
/// Queued responses are consumed first, then the handler (if any), then the
/// default evaluation. Clones share the same queue and call log.
#[derive(Clone)]
pub struct MockModel {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    handler: Option<Arc<Handler>>,
    latency: Option<Arc<Latency>>,
    calls: Arc<Mutex<Vec<ModelCall>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            handler: None,
            latency: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response.into()));
        self
    }

    /// Add a failed call to the queue
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Err(message.into()));
        self
    }

    /// Answer every unscripted call with `handler(system, user)`
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sleep before answering, based on the user prompt
    pub fn with_latency<F>(mut self, latency: F) -> Self
    where
        F: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.latency = Some(Arc::new(latency));
        self
    }

    /// Always fail
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new().with_handler(move |_, _| Err(message.clone()))
    }

    /// Get all calls in the order they were made
    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of times the model was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Check if a user prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.user_prompt.contains(text))
    }

    /// Highest number of calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, String> {
        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return scripted;
        }
        match &self.handler {
            Some(handler) => handler(system_prompt, user_prompt),
            None => Ok(DEFAULT_MOCK_EVALUATION.to_string()),
        }
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(ModelCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(user_prompt)).await;
        }
        let outcome = self.respond(system_prompt, user_prompt);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome.map_err(|message| ProviderError::request(PROVIDER, message))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
