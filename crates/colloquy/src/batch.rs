//! JSON Lines batch files.
//!
//! Input files carry one [`Submission`] per line:
//!
//! ```text
//! {"id":"chat-1","model":"gpt-4o","instructions":"Summarise.","conversation":"user: hi"}
//! ```
//!
//! Result files carry one [`ResultLine`] per dispatched item. A result file
//! from an earlier run can be fed back with [`read_completed`] to skip the
//! items that already succeeded.

use colloquy_core::{Outcome, Submission};
use colloquy_dispatch::BatchReport;
use colloquy_error::{ColloquyResult, IoError, JsonError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use tracing::{debug, instrument};

/// One line of a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLine {
    /// Submission identifier
    pub id: String,
    /// Terminal outcome
    pub outcome: Outcome,
}

/// Read submissions from JSON Lines. Blank lines are ignored.
///
/// # Errors
///
/// Returns a `JsonError` carrying the 1-based line number of the first
/// malformed line, or an `IoError` if reading fails.
///
/// ```
/// use colloquy::read_submissions;
///
/// let input = r#"{"id":"a","model":"gpt-4o","conversation":"user: hi"}
///
/// {"id":"b","model":"gemini-2.5-flash","instructions":"Summarise.","conversation":"user: bye"}
/// "#;
/// let batch = read_submissions(input.as_bytes()).unwrap();
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch[0].payload.instructions, "");
/// ```
#[instrument(skip(reader))]
pub fn read_submissions(reader: impl BufRead) -> ColloquyResult<Vec<Submission>> {
    let mut submissions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IoError::new("<input>", e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let submission: Submission = serde_json::from_str(&line)
            .map_err(|e| JsonError::at_input_line(index + 1, e.to_string()))?;
        submissions.push(submission);
    }
    debug!(count = submissions.len(), "Read submissions");
    Ok(submissions)
}

/// Ids recorded as succeeded in an earlier results file.
///
/// Failed outcomes are not included, so those items are dispatched again.
///
/// # Errors
///
/// Returns a `JsonError` for a malformed line, or an `IoError` if reading
/// fails.
#[instrument(skip(reader))]
pub fn read_completed(reader: impl BufRead) -> ColloquyResult<HashSet<String>> {
    let mut completed = HashSet::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IoError::new("<results>", e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let result: ResultLine = serde_json::from_str(&line)
            .map_err(|e| JsonError::at_input_line(index + 1, e.to_string()))?;
        if result.outcome.is_success() {
            completed.insert(result.id);
        } else {
            completed.remove(&result.id);
        }
    }
    debug!(count = completed.len(), "Read completed ids");
    Ok(completed)
}

/// Write one result line per outcome in `report`, following `order`.
///
/// Ids in `order` without an outcome (skipped items) are left out. Returns
/// the number of lines written.
///
/// # Errors
///
/// Returns an `IoError` if writing fails.
pub fn write_results<'a>(
    mut writer: impl Write,
    report: &BatchReport,
    order: impl IntoIterator<Item = &'a str>,
) -> ColloquyResult<usize> {
    let mut written = 0;
    for id in order {
        let Some(outcome) = report.outcome(id) else {
            continue;
        };
        let line = ResultLine {
            id: id.to_string(),
            outcome: outcome.clone(),
        };
        let json = serde_json::to_string(&line).map_err(|e| JsonError::new(e.to_string()))?;
        writeln!(writer, "{}", json).map_err(|e| IoError::new("<output>", e.to_string()))?;
        written += 1;
    }
    writer
        .flush()
        .map_err(|e| IoError::new("<output>", e.to_string()))?;
    Ok(written)
}

/// True when both paths name the same existing file, however spelled.
///
/// A path that does not exist yet is never the same as another.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Open a results file for writing.
///
/// When `resume` names the same file, new lines are appended so the
/// successes being skipped stay on record; otherwise the file is truncated.
///
/// # Errors
///
/// Returns an `IoError` if the file cannot be opened.
pub fn open_results(path: &Path, resume: Option<&Path>) -> ColloquyResult<BufWriter<File>> {
    let append = resume.is_some_and(|resume| same_file(path, resume));
    let mut options = OpenOptions::new();
    if append {
        options.create(true).append(true);
    } else {
        options.create(true).write(true).truncate(true);
    }
    debug!(path = %path.display(), append, "Opening results file");
    let file = options
        .open(path)
        .map_err(|e| IoError::new(path, e.to_string()))?;
    Ok(BufWriter::new(file))
}
