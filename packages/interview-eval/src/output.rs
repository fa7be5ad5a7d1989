//! JSON result writer.

use std::path::Path;

use tracing::info;

use crate::error::{EvalError, Result};
use crate::evaluator::EvaluationResult;

/// Render results as a pretty-printed JSON array (2-space indent).
pub fn render_results(results: &[EvaluationResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

/// Write results to `path`, replacing any existing file.
pub fn write_results(path: &Path, results: &[EvaluationResult]) -> Result<()> {
    let output_error = |source: std::io::Error| EvalError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let json = render_results(results).map_err(|e| output_error(e.into()))?;
    std::fs::write(path, json).map_err(output_error)?;

    info!(path = %path.display(), results = results.len(), "Results saved");
    Ok(())
}
