//! LLM provider adapters for Colloquy.
//!
//! Every backend sits behind the [`ProviderAdapter`] contract: one call per
//! attempt with a given output-token limit, cancellation on timeout, keyword
//! classification of failures, and best-effort usage extraction.
//!
//! # Available Providers
//!
//! - **OpenAI** chat completions ([`OpenAiAdapter`])
//! - **Gemini** `generateContent` ([`GeminiAdapter`])
//! - **Anthropic** messages ([`AnthropicAdapter`])
//!
//! [`ProviderClient`] is the closed set of the three, chosen from a model's
//! [`ModelProfile`](colloquy_core::ModelProfile).
//!
//! # Example
//!
//! ```no_run
//! use colloquy_core::{ModelProfile, Payload, ProviderKind};
//! use colloquy_models::{ProviderAdapter, ProviderClient};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ModelProfile::builder()
//!     .provider(ProviderKind::Gemini)
//!     .base_output_limit(20_000)
//!     .build()?;
//! let client = ProviderClient::from_profile("gemini-2.5-flash", &profile)?;
//! let payload = Payload::new("Summarise the conversation.", "user: hello");
//! let response = client.invoke(&payload, 20_000, Duration::from_secs(60)).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod anthropic;
mod classify;
mod client;
mod gemini;
mod openai;
mod transport;

pub use adapter::{ProviderAdapter, RawResponse};
pub use anthropic::{AnthropicAdapter, AnthropicRequest};
pub use classify::{
    ANTHROPIC_KEYWORDS, GEMINI_KEYWORDS, KeywordTable, OPENAI_KEYWORDS, classify_with,
    contains_keyword,
};
pub use client::ProviderClient;
pub use gemini::{GeminiAdapter, GeminiRequest};
pub use openai::{OpenAiAdapter, OpenAiRequest, is_reasoning_model};
