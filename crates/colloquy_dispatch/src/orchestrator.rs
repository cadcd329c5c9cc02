//! Per-request retry state machine.

use crate::{AttemptEvent, AttemptObserver, BackoffPolicy, RequestPacer, TracingObserver};
use colloquy_core::{AttemptRecord, AttemptResult, ModelProfile, Outcome, Payload};
use colloquy_models::ProviderAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{instrument, trace};

/// Where a request is in its retry lifecycle.
#[derive(Debug)]
enum State {
    /// About to make attempt `n`
    Attempting(u32),
    /// Sleeping before attempt `next`
    Backoff { next: u32, delay: Duration },
    /// Terminal
    Done(Outcome),
}

/// Drives one request from first attempt to terminal [`Outcome`].
///
/// Attempts are strictly sequential. Attempt `n` asks for
/// `base_output_limit * 2^n` output tokens (capped at the profile's ceiling)
/// and is bounded by the profile's timeout. A `Fatal` failure ends the run
/// immediately; retryable failures back off and retry until `max_retries`
/// attempts have been made.
///
/// Cheap to clone; all state lives in `Arc`s.
#[derive(Clone)]
pub struct RetryOrchestrator {
    adapter: Arc<dyn ProviderAdapter>,
    profile: Arc<ModelProfile>,
    backoff: BackoffPolicy,
    pacer: Option<Arc<RequestPacer>>,
    observer: Arc<dyn AttemptObserver>,
}

impl RetryOrchestrator {
    /// Orchestrator for one model, logging through `tracing`.
    pub fn new(adapter: Arc<dyn ProviderAdapter>, profile: Arc<ModelProfile>) -> Self {
        let backoff = BackoffPolicy::from_profile(&profile);
        Self {
            adapter,
            profile,
            backoff,
            pacer: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Pace every attempt through a shared limiter.
    pub fn with_pacer(mut self, pacer: Option<Arc<RequestPacer>>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Model profile in use.
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// Run a request to completion.
    pub async fn run(&self, id: &str, payload: &Payload) -> Outcome {
        self.run_recorded(id, payload).await.0
    }

    /// Run a request to completion, also returning every attempt made.
    #[instrument(
        name = "retry",
        skip(self, payload),
        fields(model = self.adapter.model_name(), max_retries = *self.profile.max_retries())
    )]
    pub async fn run_recorded(&self, id: &str, payload: &Payload) -> (Outcome, Vec<AttemptRecord>) {
        let mut history = Vec::new();
        let mut state = State::Attempting(0);
        loop {
            state = match state {
                State::Attempting(attempt) => self.attempt(id, payload, attempt, &mut history).await,
                State::Backoff { next, delay } => {
                    trace!(next, delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                    State::Attempting(next)
                }
                State::Done(outcome) => {
                    self.observer
                        .on_outcome(id, self.adapter.model_name(), &outcome);
                    return (outcome, history);
                }
            };
        }
    }

    async fn attempt(
        &self,
        id: &str,
        payload: &Payload,
        attempt: u32,
        history: &mut Vec<AttemptRecord>,
    ) -> State {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let output_limit = self.profile.output_limit_for(attempt);
        let started = Instant::now();
        let result = self
            .adapter
            .invoke(payload, output_limit, self.profile.timeout())
            .await;
        let elapsed = started.elapsed();

        let (record, next) = match result {
            Ok(response) => {
                let usage = self.adapter.extract_usage(&response);
                let record = AttemptRecord {
                    attempt,
                    output_limit,
                    result: AttemptResult::Succeeded,
                    elapsed,
                    delay: None,
                };
                let outcome = Outcome::Succeeded {
                    payload: response.into_text(),
                    usage,
                    attempts: attempt + 1,
                };
                (record, State::Done(outcome))
            }
            Err(error) => {
                let class = self.adapter.classify(&error);
                let message = error.message();
                let exhausted =
                    !class.is_retryable() || attempt + 1 >= *self.profile.max_retries();
                let delay = (!exhausted).then(|| self.backoff.delay(attempt, class));
                let record = AttemptRecord {
                    attempt,
                    output_limit,
                    result: AttemptResult::Failed {
                        class,
                        message: message.clone(),
                    },
                    elapsed,
                    delay,
                };
                let next = match delay {
                    Some(delay) => State::Backoff {
                        next: attempt + 1,
                        delay,
                    },
                    None => State::Done(Outcome::Failed {
                        last_error: message,
                        class,
                        attempts_made: attempt + 1,
                    }),
                };
                (record, next)
            }
        };

        self.observer.on_attempt(&AttemptEvent {
            id,
            model: self.adapter.model_name(),
            record: &record,
        });
        history.push(record);
        next
    }
}

impl std::fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("model", &self.adapter.model_name())
            .field("profile", &self.profile)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
