//! Typed errors for the evaluation pipeline.
//!
//! Row-level variants (`MalformedTranscript`, `Provider`) are recovered by the
//! evaluator; everything else aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed transport error from a provider client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during an evaluation run.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Missing credential or invalid setting
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input CSV does not exist
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// Input CSV cannot be read as a table with the transcript column
    #[error("input file {} is malformed: {reason}", path.display())]
    InputMalformed { path: PathBuf, reason: String },

    /// Transcript blob does not split into interviewer/interviewee parts
    #[error("malformed transcript: {reason}")]
    MalformedTranscript { reason: String },

    /// Model call failed after retries
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Result set could not be persisted
    #[error("failed to write results to {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run was cancelled before all rows were attempted
    #[error("evaluation cancelled")]
    Cancelled,
}

impl EvalError {
    /// Whether the error only affects the row it was raised for.
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::MalformedTranscript { .. } | Self::Provider(_))
    }
}

/// Errors raised by a [`ModelClient`](crate::client::ModelClient).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A single request failed
    #[error("{provider} request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: BoxError,
    },

    /// Every attempt allowed by the retry policy failed
    #[error("{provider} failed after {attempts} attempts: {last}")]
    Exhausted {
        provider: &'static str,
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    pub fn request(provider: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Request {
            provider,
            source: source.into(),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::Request { provider, .. } | Self::Exhausted { provider, .. } => provider,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EvalError>;
