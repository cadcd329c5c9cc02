//! Configuration error types.

/// Configuration error with source location.
///
/// Raised while loading or validating dispatch configuration (model
/// profiles, concurrency tiers, retry defaults).
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy_error::ConfigError;
    ///
    /// let err = ConfigError::new("max_delay_secs must be >= base_delay_secs");
    /// assert!(err.message.contains("max_delay_secs"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create an error for a profile field that failed validation.
    #[track_caller]
    pub fn invalid_field(model: &str, field: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(format!("model '{}': invalid {}: {}", model, field, reason))
    }
}
