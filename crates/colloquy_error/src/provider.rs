//! Provider call errors.
//!
//! These are the raw failures a provider adapter reports. They carry no retry
//! decision themselves; adapters classify them by matching keywords against
//! [`ProviderError::message`].

/// Raw failure conditions reported by a provider call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The attempt exceeded its per-attempt timeout and was abandoned
    #[display("request timed out after {}ms", after_ms)]
    Timeout {
        /// Timeout that elapsed, in milliseconds
        after_ms: u64,
    },
    /// Non-success HTTP status returned by the provider
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// Connection-level failure before a response arrived
    #[display("transport error: {}", _0)]
    Transport(String),
    /// Provider answered successfully but reported an error in the body
    #[display("provider error: {}", _0)]
    Api(String),
    /// Response body could not be decoded
    #[display("failed to parse provider response: {}", _0)]
    Parse(String),
    /// API key environment variable not set
    #[display("{} environment variable not set", _0)]
    MissingApiKey(String),
    /// HTTP client could not be constructed
    #[display("failed to create HTTP client: {}", _0)]
    ClientCreation(String),
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use colloquy_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(
///     "openai",
///     ProviderErrorKind::Http { status_code: 429, message: "Too Many Requests".into() },
/// );
/// assert_eq!(err.message(), "HTTP 429 error: Too Many Requests");
/// assert!(!err.is_timeout());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error ({}): {} at line {} in {}", provider, kind, line, file)]
pub struct ProviderError {
    /// Provider that produced the error
    pub provider: &'static str,
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(provider: &'static str, kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            provider,
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create a timeout error for an attempt abandoned after `after`.
    #[track_caller]
    pub fn timeout(provider: &'static str, after: std::time::Duration) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Timeout {
                after_ms: after.as_millis().min(u64::MAX as u128) as u64,
            },
        )
    }

    /// Textual form used for classification.
    ///
    /// Excludes the source location so file and line numbers can never match
    /// a status-code keyword.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// True when the attempt was abandoned because its timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ProviderErrorKind::Timeout { .. })
    }
}
