//! Batch evaluation pipeline.
//!
//! Reads transcript rows, extracts the question/answer pair from each, asks
//! the model for an evaluation and collects the results in input order. Rows
//! that cannot be parsed or evaluated are skipped and logged; the run
//! continues with the next row.

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ModelClient;
use crate::config::DEFAULT_TRANSCRIPT_COLUMN;
use crate::error::{EvalError, Result};
use crate::input::{self, TranscriptRow};
use crate::prompts::PromptSet;
use crate::transcript;

const PREVIEW_CHARS: usize = 50;

/// One evaluated row, as written to the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub question: String,
    pub answer: String,
    /// Raw model output, stored verbatim
    pub evaluation: String,
}

/// A row that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based data row number
    pub row: usize,
    pub reason: String,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Successful rows in input order
    pub results: Vec<EvaluationResult>,
    pub skipped: Vec<SkippedRow>,
    pub total_rows: usize,
}

/// Drives a [`ModelClient`] over every row of an input file.
pub struct Evaluator {
    client: Arc<dyn ModelClient>,
    prompts: PromptSet,
    column: String,
    concurrency: usize,
}

impl Evaluator {
    pub fn new(client: Arc<dyn ModelClient>, prompts: PromptSet) -> Self {
        Self {
            client,
            prompts,
            column: DEFAULT_TRANSCRIPT_COLUMN.to_string(),
            concurrency: 1,
        }
    }

    /// Read transcripts from `column` instead of the default.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Evaluate up to `concurrency` rows at once. Output order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Evaluate one input row. A row without a transcript cell is malformed.
    pub async fn evaluate_row(&self, row: &TranscriptRow) -> Result<EvaluationResult> {
        let Some(raw_text) = row.transcript.as_deref() else {
            return Err(EvalError::MalformedTranscript {
                reason: "missing transcript cell".to_string(),
            });
        };
        self.evaluate_transcript(raw_text).await
    }

    /// Extract, render and evaluate a single transcript blob.
    pub async fn evaluate_transcript(&self, raw_text: &str) -> Result<EvaluationResult> {
        let pair = transcript::extract(raw_text)?;
        let user_prompt = self.prompts.user_prompt(&pair.question, &pair.answer);

        let evaluation = self.client.call(&self.prompts.system, &user_prompt).await?;

        Ok(EvaluationResult {
            question: pair.question,
            answer: pair.answer,
            evaluation,
        })
    }

    /// Evaluate every row of the CSV file at `path`.
    ///
    /// Fails if the file is missing or unreadable, or if `cancel` fires
    /// before every row has been attempted. Per-row failures are recorded in
    /// [`EvaluationReport::skipped`].
    pub async fn process_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<EvaluationReport> {
        let rows = input::read_rows(path, &self.column)?;
        info!(
            path = %path.display(),
            rows = rows.len(),
            provider = self.client.provider_name(),
            concurrency = self.concurrency,
            "Evaluating transcripts"
        );
        self.process_rows(rows, cancel).await
    }

    /// Evaluate already-loaded rows, preserving their order.
    pub async fn process_rows(
        &self,
        rows: Vec<TranscriptRow>,
        cancel: &CancellationToken,
    ) -> Result<EvaluationReport> {
        let mut report = EvaluationReport {
            total_rows: rows.len(),
            ..Default::default()
        };

        let outcomes = stream::iter(rows)
            .map(|row| async move {
                debug!(row = row.row, "Evaluating row");
                let outcome = self.evaluate_row(&row).await;
                (row.row, outcome)
            })
            .buffered(self.concurrency);
        tokio::pin!(outcomes);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        completed = report.results.len() + report.skipped.len(),
                        total = report.total_rows,
                        "Evaluation cancelled"
                    );
                    return Err(EvalError::Cancelled);
                }
                next = outcomes.next() => next,
            };

            let Some((row, outcome)) = next else {
                break;
            };

            match outcome {
                Ok(result) => {
                    info!(row, question = %preview(&result.question), "Processed question");
                    report.results.push(result);
                }
                Err(e) if e.is_row_level() => {
                    warn!(row, error = %e, "Skipping row");
                    report.skipped.push(SkippedRow {
                        row,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            evaluated = report.results.len(),
            skipped = report.skipped.len(),
            total = report.total_rows,
            "Evaluation finished"
        );
        Ok(report)
    }
}

/// First characters of `text` followed by an ellipsis.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
