//! The provider call contract.

use async_trait::async_trait;
use colloquy_core::{FailureClass, Payload, UsageStats};
use colloquy_error::ProviderError;
use std::time::Duration;

/// Successful provider response: the extracted text plus the decoded body,
/// kept for usage extraction.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RawResponse {
    /// Generated text (possibly empty)
    text: String,
    /// Full decoded response body
    body: serde_json::Value,
}

impl RawResponse {
    /// Create a response from text and body.
    pub fn new(text: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            body,
        }
    }

    /// Response with no body, as produced by test doubles.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, serde_json::Value::Null)
    }

    /// Consume the response, keeping the text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Uniform call contract over heterogeneous LLM backends.
///
/// Implementations hold only immutable client configuration; concurrent
/// calls share nothing mutable.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for logs, metrics and error attribution.
    fn provider_name(&self) -> &'static str;

    /// Model identifier sent to the provider.
    fn model_name(&self) -> &str;

    /// Make exactly one provider call with the given output-token limit.
    ///
    /// No timeout is applied here; see [`ProviderAdapter::invoke`].
    async fn call(&self, payload: &Payload, output_limit: u32)
    -> Result<RawResponse, ProviderError>;

    /// [`call`](ProviderAdapter::call) bounded by `timeout`.
    ///
    /// When the timeout elapses the in-flight call is dropped and a
    /// `Timeout` error is returned, distinct from any backend error.
    async fn invoke(
        &self,
        payload: &Payload,
        output_limit: u32,
        timeout: Duration,
    ) -> Result<RawResponse, ProviderError> {
        match tokio::time::timeout(timeout, self.call(payload, output_limit)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.provider_name(), timeout)),
        }
    }

    /// Map a raw failure to its retry category.
    fn classify(&self, error: &ProviderError) -> FailureClass;

    /// Token usage reported in a response, if any.
    fn extract_usage(&self, response: &RawResponse) -> Option<UsageStats>;
}
