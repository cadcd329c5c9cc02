//! Bounded-concurrency batch dispatch with retry.
//!
//! A batch of [`Submission`](colloquy_core::Submission)s is admitted through
//! a [`ConcurrencyGate`], each request runs its own [`RetryOrchestrator`]
//! against the model's provider adapter, and terminal outcomes land in a
//! [`ResultAggregator`]. One request's failure never affects another's.
//!
//! # Flow
//!
//! ```text
//! submissions ──► ConcurrencyGate (k in flight) ──► RetryOrchestrator ──► ResultAggregator
//!                                                    │  attempt n: limit = base·2ⁿ
//!                                                    │  fatal → Failed
//!                                                    │  retryable → backoff → n+1
//! ```
//!
//! # Example
//!
//! ```no_run
//! use colloquy_core::{Payload, PayloadWeight, Submission};
//! use colloquy_dispatch::{DispatchConfig, Dispatcher};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new(DispatchConfig::load()?);
//! let report = dispatcher
//!     .dispatch(
//!         vec![Submission::new("c-1", Payload::new("Summarise.", "user: hi"), "gpt-4o")],
//!         PayloadWeight::Heavy.into(),
//!     )
//!     .await?;
//! assert_eq!(report.summary.submitted, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod aggregator;
mod backoff;
mod config;
mod dispatcher;
mod gate;
mod metrics;
mod observer;
mod orchestrator;
mod pacing;

pub use aggregator::{BatchReport, Progress, ResultAggregator};
pub use backoff::{BackoffPolicy, Jitter};
pub use config::{DispatchConfig, ModelOverrides};
pub use dispatcher::{AdapterFactory, Dispatcher, EnvAdapterFactory};
pub use gate::{ConcurrencyGate, ConcurrencyLimit, GatePermit};
pub use metrics::DispatchMetrics;
pub use observer::{AttemptEvent, AttemptObserver, MetricsObserver, ObserverSet, TracingObserver};
pub use orchestrator::RetryOrchestrator;
pub use pacing::RequestPacer;
