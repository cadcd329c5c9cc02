//! Failure classification and terminal outcomes.

use crate::UsageStats;
use serde::{Deserialize, Serialize};

/// Retry category of a failed attempt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureClass {
    /// The attempt's own timeout elapsed
    Timeout,
    /// Provider signalled rate limiting or quota exhaustion
    RateLimited,
    /// Provider-side 5xx style failure
    ServerError,
    /// Anything else; never retried
    Fatal,
}

impl FailureClass {
    /// Whether an attempt failing this way may be retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureClass::Fatal)
    }
}

/// Terminal result of one request. Produced exactly once per request.
///
/// ```
/// use colloquy_core::{FailureClass, Outcome};
///
/// let failed = Outcome::Failed {
///     last_error: "HTTP 400 error: bad request".into(),
///     class: FailureClass::Fatal,
///     attempts_made: 1,
/// };
/// assert!(!failed.is_success());
/// assert_eq!(failed.attempts(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The provider returned a response
    Succeeded {
        /// Model output text (may be empty)
        payload: String,
        /// Token usage, when the provider reported it
        usage: Option<UsageStats>,
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// Retries were exhausted or the failure was fatal
    Failed {
        /// Text of the last error
        last_error: String,
        /// Classification of the last error
        class: FailureClass,
        /// Attempts made before giving up
        attempts_made: u32,
    },
}

impl Outcome {
    /// True for `Succeeded`.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    /// Attempts consumed reaching this outcome.
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Succeeded { attempts, .. } => *attempts,
            Outcome::Failed { attempts_made, .. } => *attempts_made,
        }
    }

    /// Final classification of a failure.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Outcome::Succeeded { .. } => None,
            Outcome::Failed { class, .. } => Some(*class),
        }
    }

    /// Token usage of a success.
    pub fn usage(&self) -> Option<&UsageStats> {
        match self {
            Outcome::Succeeded { usage, .. } => usage.as_ref(),
            Outcome::Failed { .. } => None,
        }
    }
}
