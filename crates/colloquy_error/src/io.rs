//! File I/O error types.

use std::path::{Path, PathBuf};

/// I/O failure while reading batch input or writing results.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("I/O Error: {} ({}) at line {} in {}", message, path.display(), line, file)]
pub struct IoError {
    /// Path being read or written
    pub path: PathBuf,
    /// The underlying error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl IoError {
    /// Create a new IoError for `path` at the current location.
    ///
    /// ```
    /// use colloquy_error::IoError;
    ///
    /// let err = IoError::new("batch.jsonl", "No such file or directory");
    /// assert!(err.to_string().contains("batch.jsonl"));
    /// ```
    #[track_caller]
    pub fn new(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
