//! Core data types for the Colloquy batch dispatch engine.
//!
//! This crate holds the vocabulary shared by the provider adapters and the
//! dispatcher: what a request is, how a model is configured, what an attempt
//! and an outcome look like, and how a finished batch is summarised.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attempt;
mod outcome;
mod profile;
mod provider;
mod request;
mod summary;
mod usage;
mod weight;

pub use attempt::{AttemptRecord, AttemptResult};
pub use outcome::{FailureClass, Outcome};
pub use profile::{
    DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_DELAY_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_RATE_LIMIT_FLOOR_SECS, DEFAULT_TIMEOUT_SECS, FloorScope, ModelProfile,
    ModelProfileBuilder, RetryDefaults,
};
pub use provider::ProviderKind;
pub use request::{Payload, RequestItem, Submission};
pub use summary::RunSummary;
pub use usage::UsageStats;
pub use weight::{ConcurrencyTiers, PayloadWeight};
