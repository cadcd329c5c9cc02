//! Per-attempt bookkeeping.

use crate::FailureClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    /// The provider answered
    Succeeded,
    /// The call failed and was classified
    Failed {
        /// Retry category
        class: FailureClass,
        /// Error text
        message: String,
    },
}

/// One try of one request. Lives only for the duration of a retry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 0-based attempt index
    pub attempt: u32,
    /// Output-token limit requested on this attempt
    pub output_limit: u32,
    /// How the attempt ended
    pub result: AttemptResult,
    /// Wall time spent in the provider call
    pub elapsed: Duration,
    /// Backoff scheduled after this attempt, if another follows
    pub delay: Option<Duration>,
}

impl AttemptRecord {
    /// Classification of a failed attempt.
    pub fn class(&self) -> Option<FailureClass> {
        match &self.result {
            AttemptResult::Succeeded => None,
            AttemptResult::Failed { class, .. } => Some(*class),
        }
    }
}
