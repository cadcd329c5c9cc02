//! Batch submission.

use crate::{
    AttemptObserver, BatchReport, ConcurrencyGate, ConcurrencyLimit, DispatchConfig,
    ObserverSet, RequestPacer, ResultAggregator, RetryOrchestrator,
};
use colloquy_core::{FailureClass, ModelProfile, Outcome, RequestItem, Submission};
use colloquy_error::{ColloquyResult, DispatchError, DispatchErrorKind, ProviderError};
use colloquy_models::{ProviderAdapter, ProviderClient};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

/// Builds the adapter for a model. Called once per distinct model per batch.
pub trait AdapterFactory: Send + Sync {
    /// Adapter serving `model` under `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot be configured (e.g. a missing
    /// API key); the batch is then rejected before any call is made.
    fn adapter_for(
        &self,
        model: &str,
        profile: &ModelProfile,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError>;
}

/// Production factory: HTTP adapters keyed by the profile's provider, with
/// API keys from the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAdapterFactory;

impl AdapterFactory for EnvAdapterFactory {
    fn adapter_for(
        &self,
        model: &str,
        profile: &ModelProfile,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        Ok(Arc::new(ProviderClient::from_profile(model, profile)?))
    }
}

impl<F> AdapterFactory for F
where
    F: Fn(&str, &ModelProfile) -> Result<Arc<dyn ProviderAdapter>, ProviderError> + Send + Sync,
{
    fn adapter_for(
        &self,
        model: &str,
        profile: &ModelProfile,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        self(model, profile)
    }
}

/// Everything shared by the requests of one model.
struct ModelLane {
    profile: Arc<ModelProfile>,
    orchestrator: RetryOrchestrator,
}

/// Dispatches batches of submissions under a concurrency bound.
///
/// # Example
///
/// ```no_run
/// use colloquy_core::{Payload, PayloadWeight, Submission};
/// use colloquy_dispatch::{DispatchConfig, Dispatcher};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher = Dispatcher::new(DispatchConfig::load()?);
/// let batch = vec![
///     Submission::new("chat-1", Payload::new("Summarise.", "user: hi"), "gemini-2.5-flash"),
///     Submission::new("chat-2", Payload::new("Summarise.", "user: bye"), "gpt-4o"),
/// ];
/// let report = dispatcher.dispatch(batch, PayloadWeight::Normal.into()).await?;
/// println!("{}", report.summary);
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    config: Arc<DispatchConfig>,
    factory: Arc<dyn AdapterFactory>,
    observer: Arc<dyn AttemptObserver>,
}

impl Dispatcher {
    /// Dispatcher using HTTP adapters, logging and metrics.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config: Arc::new(config),
            factory: Arc::new(EnvAdapterFactory),
            observer: Arc::new(ObserverSet::standard()),
        }
    }

    /// Replace the adapter factory.
    pub fn with_factory(mut self, factory: impl AdapterFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Replace the attempt observer.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch every submission and wait for all of them to finish.
    ///
    /// # Errors
    ///
    /// Fails only for invalid input: a zero concurrency limit, duplicate
    /// ids, an unknown model, or an adapter that cannot be configured.
    /// Provider failures never fail the batch; they become `Failed`
    /// outcomes.
    pub async fn dispatch(
        &self,
        submissions: Vec<Submission>,
        limit: ConcurrencyLimit,
    ) -> ColloquyResult<BatchReport> {
        self.dispatch_resuming(submissions, limit, &HashSet::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), skipping ids already known to have
    /// succeeded. Skipped ids get no outcome and are counted in
    /// `RunSummary::skipped`.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    #[instrument(skip_all, fields(submitted = submissions.len(), completed = completed.len()))]
    pub async fn dispatch_resuming(
        &self,
        submissions: Vec<Submission>,
        limit: ConcurrencyLimit,
        completed: &HashSet<String>,
    ) -> ColloquyResult<BatchReport> {
        let gate = ConcurrencyGate::new(limit.resolve(&self.config.concurrency))?;

        let mut seen = HashSet::with_capacity(submissions.len());
        for submission in &submissions {
            if !seen.insert(submission.id.as_str()) {
                return Err(DispatchError::new(DispatchErrorKind::DuplicateId(
                    submission.id.clone(),
                ))
                .into());
            }
        }

        let (pending, skipped): (Vec<Submission>, Vec<Submission>) = submissions
            .into_iter()
            .partition(|submission| !completed.contains(&submission.id));
        if !skipped.is_empty() {
            info!(skipped = skipped.len(), "Skipping already completed requests");
        }

        let lanes = self.build_lanes(&pending)?;
        let items: Vec<(RequestItem, RetryOrchestrator)> = pending
            .into_iter()
            .filter_map(|submission| {
                let lane = lanes.get(&submission.model)?;
                Some((
                    RequestItem::new(submission, Arc::clone(&lane.profile)),
                    lane.orchestrator.clone(),
                ))
            })
            .collect();

        let aggregator = Arc::new(
            ResultAggregator::new(items.iter().map(|(item, _)| item.id().to_string()))?
                .with_progress_interval(self.config.progress_interval)
                .with_skipped(skipped.len()),
        );

        info!(
            requests = items.len(),
            limit = gate.limit(),
            models = lanes.len(),
            "Dispatching batch"
        );

        // Dropping the set, e.g. when this future is cancelled, aborts outstanding requests.
        let mut tasks = JoinSet::new();
        for (item, orchestrator) in items {
            let gate = gate.clone();
            let aggregator = Arc::clone(&aggregator);
            tasks.spawn(async move {
                let permit = gate.admit().await?;
                let outcome = orchestrator.run(item.id(), item.payload()).await;
                drop(permit);
                aggregator.record(item.id(), outcome)
            });
        }

        let mut aborted = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(recorded) => recorded?,
                Err(join_error) => {
                    error!(error = %join_error, "Request task aborted");
                    aborted.push(join_error.to_string());
                }
            }
        }

        // A task that panicked never recorded its outcome; its id is still pending.
        if !aborted.is_empty() {
            let reason = match aborted.as_slice() {
                [single] => single.clone(),
                _ => format!("{} request tasks aborted", aborted.len()),
            };
            for id in aggregator.pending() {
                error!(id = %id, "Recording aborted request as failed");
                aggregator.record(
                    &id,
                    Outcome::Failed {
                        last_error: format!("request task aborted: {}", reason),
                        class: FailureClass::Fatal,
                        attempts_made: 0,
                    },
                )?;
            }
        }

        let report = aggregator.finalize()?;
        info!(summary = %report.summary, peak_in_flight = gate.peak(), "Batch complete");
        if let Some(tokens) = report.summary.token_report() {
            info!("{}", tokens);
        }
        Ok(report)
    }

    /// Resolve profile, adapter and pacer for every model in the batch
    /// before anything is dispatched.
    fn build_lanes(&self, submissions: &[Submission]) -> ColloquyResult<HashMap<String, ModelLane>> {
        let mut lanes = HashMap::new();
        for submission in submissions {
            if lanes.contains_key(&submission.model) {
                continue;
            }
            let model = submission.model.as_str();
            let profile = self.config.profile_for(model)?;
            let adapter = self.factory.adapter_for(model, &profile)?;
            let pacer = (*profile.requests_per_minute())
                .and_then(RequestPacer::per_minute)
                .map(Arc::new);
            debug!(
                model,
                provider = %profile.provider(),
                paced = pacer.is_some(),
                "Resolved model"
            );
            let orchestrator = RetryOrchestrator::new(adapter, Arc::clone(&profile))
                .with_pacer(pacer)
                .with_observer(Arc::clone(&self.observer));
            lanes.insert(
                submission.model.clone(),
                ModelLane {
                    profile,
                    orchestrator,
                },
            );
        }
        Ok(lanes)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
