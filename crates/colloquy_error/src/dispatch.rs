//! Dispatch error types.
//!
//! Only invalid submissions and aggregator misuse surface as errors. Failed
//! provider calls never do; they become per-item outcomes.

/// Specific error conditions for batch dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum DispatchErrorKind {
    /// Model has no profile and no provider can be inferred from its name
    #[display("Unknown model '{}' and no default provider applies", _0)]
    UnknownModel(String),
    /// Concurrency limit must be at least one
    #[display("Invalid concurrency limit: {}", _0)]
    InvalidConcurrency(usize),
    /// Two submissions in one batch share an identifier
    #[display("Duplicate request id in batch: {}", _0)]
    DuplicateId(String),
    /// The concurrency gate was closed while requests were waiting
    #[display("Concurrency gate closed")]
    GateClosed,
    /// An outcome was recorded twice for the same request
    #[display("Outcome already recorded for request '{}'", _0)]
    DuplicateOutcome(String),
    /// An outcome was recorded for an id that was never submitted
    #[display("Outcome recorded for unknown request '{}'", _0)]
    UnknownOutcome(String),
    /// Summary requested before every submitted request finished
    #[display("Batch incomplete: {} of {} outcomes recorded", recorded, submitted)]
    Incomplete {
        /// Outcomes recorded so far
        recorded: usize,
        /// Requests submitted
        submitted: usize,
    },
}

/// Error type for dispatch operations.
///
/// # Examples
///
/// ```
/// use colloquy_error::{DispatchError, DispatchErrorKind};
///
/// let err = DispatchError::new(DispatchErrorKind::InvalidConcurrency(0));
/// assert!(format!("{}", err).contains("concurrency"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    /// The specific error condition
    pub kind: DispatchErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl DispatchError {
    /// Create a new DispatchError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
