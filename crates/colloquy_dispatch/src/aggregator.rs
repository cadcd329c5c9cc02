//! Concurrent outcome collection.

use colloquy_core::{Outcome, RunSummary};
use colloquy_error::{DispatchError, DispatchErrorKind};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, info};

/// Final product of a batch: one outcome per dispatched id, plus counts.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Outcome per request identifier
    pub outcomes: HashMap<String, Outcome>,
    /// Aggregate counts
    pub summary: RunSummary,
}

impl BatchReport {
    /// Outcome for one request.
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.get(id)
    }
}

/// Running counts of a batch in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Requests dispatched
    pub submitted: usize,
    /// Outcomes recorded so far
    pub recorded: usize,
    /// Successes so far
    pub succeeded: usize,
    /// Failures so far
    pub failed: usize,
}

impl Progress {
    /// True once every request has an outcome.
    pub fn is_complete(&self) -> bool {
        self.recorded >= self.submitted
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} done ({} succeeded, {} failed)",
            self.recorded, self.submitted, self.succeeded, self.failed
        )
    }
}

#[derive(Debug)]
struct AggregatorState {
    pending: HashSet<String>,
    outcomes: HashMap<String, Outcome>,
    summary: RunSummary,
}

/// Collects terminal outcomes in any arrival order.
///
/// Each `record` is a single critical section: the outcome is stored and
/// the counts updated together, so no interleaving can lose or double-count
/// an outcome.
///
/// # Example
///
/// ```
/// use colloquy_core::Outcome;
/// use colloquy_dispatch::ResultAggregator;
///
/// let aggregator = ResultAggregator::new(["a".to_string(), "b".to_string()])?;
/// aggregator.record("b", Outcome::Succeeded { payload: "ok".into(), usage: None, attempts: 1 })?;
/// assert!(aggregator.finalize().is_err());
///
/// aggregator.record("a", Outcome::Succeeded { payload: "ok".into(), usage: None, attempts: 2 })?;
/// let report = aggregator.finalize()?;
/// assert_eq!(report.summary.succeeded, 2);
/// assert_eq!(report.summary.total_attempts, 3);
/// # Ok::<(), colloquy_error::DispatchError>(())
/// ```
#[derive(Debug)]
pub struct ResultAggregator {
    state: Mutex<AggregatorState>,
    progress_interval: usize,
    started: Instant,
}

impl ResultAggregator {
    /// Aggregator expecting exactly the given identifiers.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateId` if an identifier appears twice.
    pub fn new<I>(ids: I) -> Result<Self, DispatchError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut pending = HashSet::new();
        for id in ids {
            if !pending.insert(id.clone()) {
                return Err(DispatchError::new(DispatchErrorKind::DuplicateId(id)));
            }
        }
        let summary = RunSummary::new(pending.len());
        Ok(Self {
            state: Mutex::new(AggregatorState {
                outcomes: HashMap::with_capacity(pending.len()),
                pending,
                summary,
            }),
            progress_interval: 0,
            started: Instant::now(),
        })
    }

    /// Log progress every `interval` outcomes (0 disables).
    pub fn with_progress_interval(self, interval: usize) -> Self {
        Self {
            progress_interval: interval,
            ..self
        }
    }

    /// Note requests skipped before dispatch.
    pub fn with_skipped(self, skipped: usize) -> Self {
        self.lock().summary.skipped = skipped;
        self
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // A panicking recorder cannot leave the state half-updated, so a
        // poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the terminal outcome of one request.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOutcome` if the id already has an outcome, or
    /// `UnknownOutcome` if it was never submitted. Counts are unchanged in
    /// both cases.
    pub fn record(&self, id: &str, outcome: Outcome) -> Result<(), DispatchError> {
        let mut state = self.lock();
        if !state.pending.remove(id) {
            let kind = if state.outcomes.contains_key(id) {
                DispatchErrorKind::DuplicateOutcome(id.to_string())
            } else {
                DispatchErrorKind::UnknownOutcome(id.to_string())
            };
            return Err(DispatchError::new(kind));
        }
        state.summary.record(&outcome);
        state.outcomes.insert(id.to_string(), outcome);

        let recorded = state.summary.recorded();
        debug!(id, recorded, "Outcome recorded");
        if self.progress_interval > 0
            && (recorded % self.progress_interval == 0 || state.pending.is_empty())
        {
            info!(
                recorded,
                submitted = state.summary.submitted,
                succeeded = state.summary.succeeded,
                failed = state.summary.failed,
                "Batch progress"
            );
        }
        Ok(())
    }

    /// Counts so far.
    pub fn progress(&self) -> Progress {
        let state = self.lock();
        Progress {
            submitted: state.summary.submitted,
            recorded: state.summary.recorded(),
            succeeded: state.summary.succeeded,
            failed: state.summary.failed,
        }
    }

    /// True once every submitted id has an outcome.
    pub fn is_complete(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Ids still waiting for an outcome, sorted.
    pub fn pending(&self) -> Vec<String> {
        let mut pending: Vec<String> = self.lock().pending.iter().cloned().collect();
        pending.sort_unstable();
        pending
    }

    /// Snapshot of the summary, complete or not.
    pub fn summary(&self) -> RunSummary {
        let mut summary = self.lock().summary.clone();
        summary.elapsed_secs = self.started.elapsed().as_secs_f64();
        summary
    }

    /// Outcomes and final summary.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` while any submitted id lacks an outcome.
    pub fn finalize(&self) -> Result<BatchReport, DispatchError> {
        let state = self.lock();
        if !state.pending.is_empty() {
            return Err(DispatchError::new(DispatchErrorKind::Incomplete {
                recorded: state.summary.recorded(),
                submitted: state.summary.submitted,
            }));
        }
        let mut summary = state.summary.clone();
        summary.elapsed_secs = self.started.elapsed().as_secs_f64();
        Ok(BatchReport {
            outcomes: state.outcomes.clone(),
            summary,
        })
    }
}
