//! Colloquy - batch LLM analysis dispatch
//!
//! Colloquy submits a batch of independent analysis requests (instructions
//! plus a conversation) to OpenAI, Gemini or Anthropic models, with
//! per-request retry driven by failure classification and a bounded number
//! of requests in flight.
//!
//! # Features
//!
//! - **Classified retry**: timeouts, rate limits and server errors back off
//!   and retry; everything else fails immediately
//! - **Growing output budget**: each retry doubles the output-token limit
//!   up to the provider's ceiling
//! - **Bounded concurrency**: a semaphore gate sized by payload weight
//! - **Isolation**: one request's failure never affects another's outcome
//! - **Resumable batches**: ids already known to have succeeded are skipped
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use colloquy::{DispatchConfig, Dispatcher, Payload, PayloadWeight, Submission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(DispatchConfig::load()?);
//!     let batch = vec![Submission::new(
//!         "chat-1",
//!         Payload::new("Summarise the customer's issue.", "user: my card was declined"),
//!         "gemini-2.5-flash",
//!     )];
//!
//!     let report = dispatcher.dispatch(batch, PayloadWeight::Normal.into()).await?;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `colloquy_error` - Error types
//! - `colloquy_core` - Data model (profiles, submissions, outcomes, summaries)
//! - `colloquy_models` - Provider adapters and failure classification
//! - `colloquy_dispatch` - Gate, retry orchestration, aggregation, configuration
//!
//! This crate re-exports everything and adds batch file I/O and logging setup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod observability;

pub use colloquy_core::*;
pub use colloquy_dispatch::*;
pub use colloquy_error::*;
pub use colloquy_models::*;

pub use batch::{
    ResultLine, open_results, read_completed, read_submissions, same_file, write_results,
};
pub use observability::{ObservabilityConfig, init_observability};
