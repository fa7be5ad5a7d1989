//! Bounded retry with jittered exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{error, warn};

use super::ModelClient;
use crate::error::ProviderError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MULTIPLIER: Duration = Duration::from_secs(1);
const DEFAULT_MIN_WAIT: Duration = Duration::from_secs(1);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// How often and how patiently a failed model call is retried.
///
/// After failed attempt `n` the wait is drawn uniformly from
/// `[min_wait, clamp(multiplier * 2^(n-1), min_wait, max_wait)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            multiplier: DEFAULT_MULTIPLIER,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times in total without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            multiplier: Duration::ZERO,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Upper bound of the wait after failed attempt `attempt` (1-based).
    pub fn wait_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.multiplier.as_secs_f64() * 2f64.powi(exponent);
        let secs = secs
            .min(self.max_wait.as_secs_f64())
            .max(self.min_wait.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Jittered wait after failed attempt `attempt` (1-based).
    pub fn backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let low = self.min_wait.as_secs_f64();
        let high = self.wait_ceiling(attempt).as_secs_f64();
        if high <= low {
            return Duration::from_secs_f64(low);
        }
        Duration::from_secs_f64(rng.gen_range(low..=high))
    }
}

/// Wraps a [`ModelClient`] and retries failed calls per [`RetryPolicy`].
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ModelClient> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for Retrying<C> {
    async fn call(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ProviderError> {
        let provider = self.inner.provider_name();
        let mut attempt = 1;

        loop {
            match self.inner.call(system_prompt, user_prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.policy.max_attempts => {
                    let wait = {
                        let mut rng = rand::thread_rng();
                        self.policy.backoff(attempt, &mut rng)
                    };
                    warn!(
                        provider,
                        error = %e,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        wait_ms = wait.as_millis(),
                        "Model call failed, retrying..."
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(provider, error = %e, attempts = attempt, "Model call failed after all retries");
                    return Err(ProviderError::Exhausted {
                        provider,
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
