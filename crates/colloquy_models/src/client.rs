//! The closed set of provider adapters.

use crate::{AnthropicAdapter, GeminiAdapter, OpenAiAdapter, ProviderAdapter, RawResponse};
use async_trait::async_trait;
use colloquy_core::{FailureClass, ModelProfile, Payload, ProviderKind, UsageStats};
use colloquy_error::ProviderError;
use std::time::Duration;

/// One adapter per supported provider. Adding a provider adds a variant.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    /// OpenAI chat completions
    OpenAi(OpenAiAdapter),
    /// Gemini `generateContent`
    Gemini(GeminiAdapter),
    /// Anthropic messages
    Anthropic(AnthropicAdapter),
}

impl ProviderClient {
    /// Build the adapter a profile's provider calls for, reading the API key
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's API key is not set.
    pub fn from_profile(model: &str, profile: &ModelProfile) -> Result<Self, ProviderError> {
        Ok(match profile.provider() {
            ProviderKind::OpenAi => Self::OpenAi(OpenAiAdapter::new(model, profile)?),
            ProviderKind::Gemini => Self::Gemini(GeminiAdapter::new(model, profile)?),
            ProviderKind::Anthropic => Self::Anthropic(AnthropicAdapter::new(model, profile)?),
        })
    }

    /// Provider this client talks to.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::Anthropic(_) => ProviderKind::Anthropic,
        }
    }

    fn inner(&self) -> &dyn ProviderAdapter {
        match self {
            Self::OpenAi(adapter) => adapter,
            Self::Gemini(adapter) => adapter,
            Self::Anthropic(adapter) => adapter,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ProviderClient {
    fn provider_name(&self) -> &'static str {
        self.inner().provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner().model_name()
    }

    async fn call(
        &self,
        payload: &Payload,
        output_limit: u32,
    ) -> Result<RawResponse, ProviderError> {
        self.inner().call(payload, output_limit).await
    }

    async fn invoke(
        &self,
        payload: &Payload,
        output_limit: u32,
        timeout: Duration,
    ) -> Result<RawResponse, ProviderError> {
        self.inner().invoke(payload, output_limit, timeout).await
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        self.inner().classify(error)
    }

    fn extract_usage(&self, response: &RawResponse) -> Option<UsageStats> {
        self.inner().extract_usage(response)
    }
}
