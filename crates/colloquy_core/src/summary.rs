//! Batch-level counts.

use crate::{FailureClass, Outcome, UsageStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregate counts for a finished (or in-progress) batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Requests dispatched in this run
    pub submitted: usize,
    /// Outcomes that succeeded
    pub succeeded: usize,
    /// Outcomes that failed
    pub failed: usize,
    /// Requests skipped because they were already complete
    pub skipped: usize,
    /// Successes with an empty payload
    pub empty_responses: usize,
    /// Attempts across all recorded outcomes
    pub total_attempts: u64,
    /// Summed token usage of successes that reported it
    pub usage: UsageStats,
    /// Successes that reported usage
    pub usage_reported: usize,
    /// Failures grouped by final class
    pub failures_by_class: BTreeMap<FailureClass, usize>,
    /// Wall time of the run in seconds
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// Empty summary for a batch of `submitted` requests.
    pub fn new(submitted: usize) -> Self {
        Self {
            submitted,
            ..Self::default()
        }
    }

    /// Fold one outcome into the counts.
    pub fn record(&mut self, outcome: &Outcome) {
        self.total_attempts += u64::from(outcome.attempts());
        match outcome {
            Outcome::Succeeded { payload, usage, .. } => {
                self.succeeded += 1;
                if payload.trim().is_empty() {
                    self.empty_responses += 1;
                }
                if let Some(usage) = usage {
                    self.usage += *usage;
                    self.usage_reported += 1;
                }
            }
            Outcome::Failed { class, .. } => {
                self.failed += 1;
                *self.failures_by_class.entry(*class).or_default() += 1;
            }
        }
    }

    /// Outcomes recorded so far.
    pub fn recorded(&self) -> usize {
        self.succeeded + self.failed
    }

    /// True once every submitted request has an outcome.
    pub fn is_complete(&self) -> bool {
        self.recorded() >= self.submitted
    }

    /// One-line token usage report, `None` when nothing reported usage.
    ///
    /// ```
    /// use colloquy_core::{Outcome, RunSummary, UsageStats};
    ///
    /// let mut summary = RunSummary::new(1);
    /// summary.record(&Outcome::Succeeded {
    ///     payload: "ok".into(),
    ///     usage: Some(UsageStats::new(100, 20)),
    ///     attempts: 1,
    /// });
    /// assert_eq!(
    ///     summary.token_report().as_deref(),
    ///     Some("120 total tokens (100→20) for 1 conversations")
    /// );
    /// ```
    pub fn token_report(&self) -> Option<String> {
        if self.usage_reported == 0 {
            return None;
        }
        Some(format!(
            "{} total tokens ({}→{}) for {} conversations",
            self.usage.total_tokens,
            self.usage.input_tokens,
            self.usage.output_tokens,
            self.usage_reported
        ))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} submitted, {} succeeded, {} failed, {} skipped, {} empty, {} attempts in {:.1}s",
            self.submitted,
            self.succeeded,
            self.failed,
            self.skipped,
            self.empty_responses,
            self.total_attempts,
            self.elapsed_secs
        )?;
        if let Some(report) = self.token_report() {
            write!(f, "; {}", report)?;
        }
        Ok(())
    }
}
