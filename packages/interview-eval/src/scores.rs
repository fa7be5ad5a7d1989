//! Score tally over a finished results file.
//!
//! Evaluations are expected to look like
//! `{"expertise": {"score": 4, "justification": "..."}}`. Entries that do not
//! parse are counted as unreadable rather than failing the tally.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{EvalError, Result};
use crate::evaluator::EvaluationResult;

/// A score value as found in an evaluation.
///
/// Integers sort numerically and come before anything else.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Score {
    Integer(i64),
    Other(String),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Occurrences of each distinct expertise score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    pub counts: BTreeMap<Score, usize>,
    /// Entries whose evaluation had no readable score
    pub unreadable: usize,
}

impl ScoreSummary {
    /// Number of distinct scores seen.
    pub fn unique(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Tally scores in the results file at `path`.
pub fn count_scores(path: &Path) -> Result<ScoreSummary> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EvalError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => EvalError::InputMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let results: Vec<EvaluationResult> =
        serde_json::from_str(&text).map_err(|e| EvalError::InputMalformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(tally(&results))
}

/// Tally scores across already-loaded results.
pub fn tally(results: &[EvaluationResult]) -> ScoreSummary {
    let mut summary = ScoreSummary::default();

    for (i, result) in results.iter().enumerate() {
        match extract_score(&result.evaluation) {
            Some(score) => *summary.counts.entry(score).or_default() += 1,
            None => {
                warn!(entry = i + 1, "Evaluation has no readable expertise score");
                summary.unreadable += 1;
            }
        }
    }

    summary
}

/// Pull `expertise.score` out of a raw evaluation string.
pub fn extract_score(evaluation: &str) -> Option<Score> {
    let value: Value = serde_json::from_str(strip_code_fence(evaluation)).ok()?;

    match value.get("expertise")?.get("score")? {
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => Score::Integer(i),
            None => Score::Other(n.to_string()),
        }),
        Value::String(s) => Some(match s.trim().parse::<i64>() {
            Ok(i) => Score::Integer(i),
            Err(_) => Score::Other(s.trim().to_string()),
        }),
        _ => None,
    }
}

// Text-mode models sometimes wrap their JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(evaluation: &str) -> EvaluationResult {
        EvaluationResult {
            question: "Q".to_string(),
            answer: "A".to_string(),
            evaluation: evaluation.to_string(),
        }
    }

    #[test]
    fn test_counts_scores_and_unreadable_entries() {
        let results = vec![
            result(r#"{"expertise": {"score": 4, "justification": "solid"}}"#),
            result(r#"{"expertise": {"score": 2}}"#),
            result(r#"{"expertise": {"score": 4}}"#),
            result("The candidate scores 3 out of 5."),
            result(r#"{"clarity": {"score": 5}}"#),
        ];

        let summary = tally(&results);

        assert_eq!(summary.counts.get(&Score::Integer(4)), Some(&2));
        assert_eq!(summary.counts.get(&Score::Integer(2)), Some(&1));
        assert_eq!(summary.unique(), 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.unreadable, 2);
    }

    #[test]
    fn test_scores_sort_numerically() {
        let results = vec![
            result(r#"{"expertise": {"score": 10}}"#),
            result(r#"{"expertise": {"score": 2}}"#),
            result(r#"{"expertise": {"score": "N/A"}}"#),
        ];

        let order: Vec<String> = tally(&results).counts.keys().map(|s| s.to_string()).collect();
        assert_eq!(order, ["2", "10", "N/A"]);
    }

    #[test]
    fn test_extract_score_variants() {
        assert_eq!(
            extract_score(r#"{"expertise": {"score": "3"}}"#),
            Some(Score::Integer(3))
        );
        assert_eq!(
            extract_score(r#"{"expertise": {"score": 3.5}}"#),
            Some(Score::Other("3.5".to_string()))
        );
        assert_eq!(
            extract_score("```json\n{\"expertise\": {\"score\": 5}}\n```"),
            Some(Score::Integer(5))
        );
        assert_eq!(extract_score(r#"{"expertise": {"score": null}}"#), None);
        assert_eq!(extract_score(""), None);
    }

    #[test]
    fn test_count_scores_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evaluation_results.json");
        let json = serde_json::to_string_pretty(&vec![
            result(r#"{"expertise": {"score": 1}}"#),
            result(r#"{"expertise": {"score": 1}}"#),
        ])
        .unwrap();
        std::fs::write(&path, json).unwrap();

        let summary = count_scores(&path).unwrap();
        assert_eq!(summary.counts.get(&Score::Integer(1)), Some(&2));
        assert_eq!(summary.unique(), 1);
    }

    #[test]
    fn test_count_scores_rejects_bad_files() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            count_scores(&missing),
            Err(EvalError::InputNotFound { .. })
        ));

        let not_array = dir.path().join("object.json");
        std::fs::write(&not_array, r#"{"question": "Q"}"#).unwrap();
        assert!(matches!(
            count_scores(&not_array),
            Err(EvalError::InputMalformed { .. })
        ));
    }
}
