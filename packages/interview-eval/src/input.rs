//! CSV input reader.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, Result};

/// One data row of the input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    /// 1-based position among data rows (header excluded)
    pub row: usize,
    /// Raw transcript blob, `None` when the record is too short to reach
    /// the transcript column
    pub transcript: Option<String>,
}

/// Read every row's transcript cell from the CSV file at `path`.
///
/// The file must have a header row naming `column`. Quoted cells may span
/// multiple lines and records may have fewer fields than the header. Rows
/// come back in file order.
pub fn read_rows(path: &Path, column: &str) -> Result<Vec<TranscriptRow>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EvalError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => malformed(path, e),
    })?;

    let rows = read_rows_from(file, column).map_err(|reason| EvalError::InputMalformed {
        path: path.to_path_buf(),
        reason,
    })?;

    debug!(path = %path.display(), rows = rows.len(), "Read input rows");
    Ok(rows)
}

/// Read transcripts from any CSV source. Errors are plain messages; the
/// caller attaches the path.
pub fn read_rows_from<R: Read>(source: R, column: &str) -> std::result::Result<Vec<TranscriptRow>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let index = headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| format!("missing column '{}'", column))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(TranscriptRow {
            row: i + 1,
            transcript: record.get(index).map(str::to_string),
        });
    }

    Ok(rows)
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> EvalError {
    EvalError::InputMalformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
