//! JSON error types.

/// JSON serialization/deserialization error with source location.
///
/// Batch files are line-delimited JSON, so the offending input line is kept
/// when it is known.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error: {} (input line {:?}) at line {} in {}", message, input_line, line, file)]
pub struct JsonError {
    /// The underlying error message
    pub message: String,
    /// 1-based line of the JSONL input that failed, if any
    pub input_line: Option<usize>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl JsonError {
    /// Create a new JsonError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy_error::JsonError;
    ///
    /// let err = JsonError::new("Invalid JSON syntax");
    /// assert!(err.message.contains("Invalid JSON"));
    /// assert!(err.input_line.is_none());
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            input_line: None,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create a JsonError pointing at a specific line of a JSONL input.
    ///
    /// ```
    /// use colloquy_error::JsonError;
    ///
    /// let err = JsonError::at_input_line(7, "missing field `id`");
    /// assert_eq!(err.input_line, Some(7));
    /// ```
    #[track_caller]
    pub fn at_input_line(input_line: usize, message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            input_line: Some(input_line),
            line: location.line(),
            file: location.file(),
        }
    }
}
