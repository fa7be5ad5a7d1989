//! Batch evaluation of interview transcripts.
//!
//! Each row of an input CSV holds one interviewer question and the
//! candidate's answer. The pipeline splits every row into a [`QaPair`],
//! renders it into a prompt, asks an LLM (OpenAI or Claude) to grade the
//! answer and writes the raw evaluations to a JSON file.
//!
//! ```text
//! CSV row → QaPair → prompt → ModelClient → EvaluationResult → JSON file
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod input;
pub mod output;
pub mod prompts;
pub mod scores;
pub mod testing;
pub mod transcript;

pub use client::{ModelClient, RetryPolicy, Retrying};
pub use config::{ApiKey, Config, Provider, RunOptions};
pub use error::{EvalError, ProviderError, Result};
pub use evaluator::{EvaluationReport, EvaluationResult, Evaluator, SkippedRow};
pub use prompts::{PromptMode, PromptSet};
pub use transcript::QaPair;
