//! Per-attempt telemetry hooks.

use crate::DispatchMetrics;
use colloquy_core::{AttemptRecord, AttemptResult, Outcome};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One finished attempt, as seen by observers.
#[derive(Debug, Clone, Copy)]
pub struct AttemptEvent<'a> {
    /// Request identifier
    pub id: &'a str,
    /// Model name
    pub model: &'a str,
    /// The attempt, including classification, output limit and any delay
    pub record: &'a AttemptRecord,
}

/// Receives attempt and outcome notifications.
///
/// Called inline from the retry loop, so implementations must not block.
pub trait AttemptObserver: Send + Sync {
    /// A single attempt finished.
    fn on_attempt(&self, event: &AttemptEvent<'_>);

    /// A request reached its terminal outcome.
    fn on_outcome(&self, _id: &str, _model: &str, _outcome: &Outcome) {}
}

/// Logs attempts and outcomes through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        let record = event.record;
        let elapsed_ms = record.elapsed.as_millis() as u64;
        match (&record.result, record.delay) {
            (AttemptResult::Succeeded, _) => debug!(
                id = event.id,
                model = event.model,
                attempt = record.attempt,
                output_limit = record.output_limit,
                elapsed_ms,
                "Attempt succeeded"
            ),
            (AttemptResult::Failed { class, message }, Some(delay)) => warn!(
                id = event.id,
                model = event.model,
                attempt = record.attempt,
                output_limit = record.output_limit,
                class = %class,
                delay_ms = delay.as_millis() as u64,
                elapsed_ms,
                error = %message,
                "Attempt failed, retrying"
            ),
            (AttemptResult::Failed { class, message }, None) => warn!(
                id = event.id,
                model = event.model,
                attempt = record.attempt,
                output_limit = record.output_limit,
                class = %class,
                elapsed_ms,
                error = %message,
                "Attempt failed, giving up"
            ),
        }
    }

    fn on_outcome(&self, id: &str, model: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Succeeded {
                payload, attempts, ..
            } if payload.trim().is_empty() => {
                warn!(id, model, attempts, "Empty response from model")
            }
            Outcome::Succeeded { attempts, .. } => {
                info!(id, model, attempts, "Request succeeded")
            }
            Outcome::Failed {
                class,
                attempts_made,
                last_error,
            } => error!(
                id,
                model,
                class = %class,
                attempts_made,
                error = %last_error,
                "Request failed"
            ),
        }
    }
}

/// Feeds attempts and outcomes into [`DispatchMetrics`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl AttemptObserver for MetricsObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        DispatchMetrics::get().record_attempt(
            event.model,
            event.record.class(),
            event.record.elapsed.as_secs_f64(),
            event.record.delay.is_some(),
        );
    }

    fn on_outcome(&self, _id: &str, model: &str, outcome: &Outcome) {
        let metrics = DispatchMetrics::get();
        match outcome {
            Outcome::Succeeded {
                usage: Some(usage), ..
            } => metrics.record_tokens(model, usage),
            Outcome::Succeeded { usage: None, .. } => {}
            Outcome::Failed { class, .. } => metrics.record_failure(model, *class),
        }
    }
}

/// Fans notifications out to several observers in order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn AttemptObserver>>,
}

impl ObserverSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logging and metrics.
    pub fn standard() -> Self {
        Self::new().with(TracingObserver).with(MetricsObserver)
    }

    /// Add an observer.
    pub fn with(mut self, observer: impl AttemptObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Add a shared observer.
    pub fn with_shared(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// True when no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl AttemptObserver for ObserverSet {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        for observer in &self.observers {
            observer.on_attempt(event);
        }
    }

    fn on_outcome(&self, id: &str, model: &str, outcome: &Outcome) {
        for observer in &self.observers {
            observer.on_outcome(id, model, outcome);
        }
    }
}
