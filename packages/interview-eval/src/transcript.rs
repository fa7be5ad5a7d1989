//! Transcript blob parsing.
//!
//! A transcript blob is the raw text of one CSV cell, shaped as
//!
//! ```text
//! Interviewer: <question>
//!
//! Interviewee: <answer>
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

const SEGMENT_DELIMITER: &str = "\n\n";
const QUESTION_PREFIX: &str = "Interviewer:";
const ANSWER_PREFIX: &str = "Interviewee:";

/// A question and the candidate's answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Split a transcript blob into its question and answer.
///
/// The blob must contain exactly one blank-line separator with text on both
/// sides. Speaker prefixes are removed and whitespace trimmed; an empty
/// question or answer after that is accepted.
pub fn extract(raw_text: &str) -> Result<QaPair> {
    let normalized = raw_text.replace("\r\n", "\n");
    let segments: Vec<&str> = normalized.split(SEGMENT_DELIMITER).collect();

    let [question, answer] = segments.as_slice() else {
        return Err(EvalError::MalformedTranscript {
            reason: format!(
                "expected 2 blank-line separated segments, found {}",
                segments.len()
            ),
        });
    };

    if question.trim().is_empty() || answer.trim().is_empty() {
        return Err(EvalError::MalformedTranscript {
            reason: "empty interviewer or interviewee segment".to_string(),
        });
    }

    Ok(QaPair {
        question: strip_speaker(question, QUESTION_PREFIX),
        answer: strip_speaker(answer, ANSWER_PREFIX),
    })
}

fn strip_speaker(segment: &str, prefix: &str) -> String {
    let segment = segment.trim();
    segment
        .strip_prefix(prefix)
        .unwrap_or(segment)
        .trim()
        .to_string()
}
