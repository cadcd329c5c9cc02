//! Anthropic messages adapter.

use crate::classify::{ANTHROPIC_KEYWORDS, classify_with};
use crate::transport::{api_key_from_env, http_client, post_json, reject_error_body};
use crate::{ProviderAdapter, RawResponse};
use async_trait::async_trait;
use colloquy_core::{FailureClass, ModelProfile, Payload, ProviderKind, UsageStats};
use colloquy_error::{ProviderError, ProviderErrorKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

#[derive(Debug, Clone, PartialEq, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

/// Messages API request body.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct AnthropicRequest {
    /// Model identifier
    model: String,
    /// Output limit
    max_tokens: u32,
    /// Instruction text
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    /// The single user turn
    #[getter(skip)]
    messages: Vec<AnthropicMessage>,
    /// Sampling temperature
    temperature: f32,
    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    /// Top-k sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// Anthropic messages adapter.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    top_p: Option<f32>,
    top_k: Option<u32>,
}

impl AnthropicAdapter {
    /// Creates an adapter, reading the key from `ANTHROPIC_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unset or the HTTP client cannot be built.
    pub fn new(model: impl Into<String>, profile: &ModelProfile) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(PROVIDER, ProviderKind::Anthropic.api_key_var())?;
        Self::with_api_key(api_key, model, profile)
    }

    /// Creates an adapter with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_key(
        api_key: impl Into<String>,
        model: impl Into<String>,
        profile: &ModelProfile,
    ) -> Result<Self, ProviderError> {
        let model = model.into();
        debug!(model = %model, "Creating Anthropic adapter");
        Ok(Self {
            client: http_client(PROVIDER)?,
            api_key: api_key.into(),
            model,
            base_url: ANTHROPIC_API_URL.to_string(),
            temperature: *profile.temperature(),
            top_p: *profile.top_p(),
            top_k: *profile.top_k(),
        })
    }

    /// Point the adapter at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shape the request for one attempt: instructions as `system`, the
    /// conversation as the only user message.
    pub fn build_request(&self, payload: &Payload, output_limit: u32) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: output_limit,
            system: payload.instructions.clone(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: payload.conversation.clone(),
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }

    fn parse_text(body: &serde_json::Value) -> Result<String, ProviderError> {
        reject_error_body(PROVIDER, body)?;
        let response: AnthropicResponse = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::new(PROVIDER, ProviderErrorKind::Parse(e.to_string())))?;
        Ok(response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, payload), fields(provider = PROVIDER, model = %self.model, payload_len = payload.len()))]
    async fn call(
        &self,
        payload: &Payload,
        output_limit: u32,
    ) -> Result<RawResponse, ProviderError> {
        let request = self.build_request(payload, output_limit);
        let url = format!("{}/v1/messages", self.base_url);
        let body = post_json(
            PROVIDER,
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            &request,
        )
        .await?;
        let text = Self::parse_text(&body)?;
        debug!(chars = text.len(), "Received Anthropic response");
        Ok(RawResponse::new(text, body))
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        classify_with(&ANTHROPIC_KEYWORDS, error)
    }

    fn extract_usage(&self, response: &RawResponse) -> Option<UsageStats> {
        let usage: AnthropicUsage =
            serde_json::from_value(response.body().get("usage")?.clone()).ok()?;
        Some(UsageStats::new(usage.input_tokens, usage.output_tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> AnthropicAdapter {
        let profile = ModelProfile::builder()
            .provider(ProviderKind::Anthropic)
            .base_output_limit(16_000)
            .build()
            .expect("valid profile");
        AnthropicAdapter::with_api_key("key", "claude-sonnet-4-5", &profile)
            .expect("client builds")
    }

    #[test]
    fn instructions_become_system() {
        let request = adapter().build_request(&Payload::new("Be brief", "user: hi"), 32_000);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["system"], "Be brief");
        assert_eq!(body["max_tokens"], 32_000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "user: hi");
        assert_eq!(*request.max_tokens(), 32_000);
    }

    #[test]
    fn only_text_blocks_are_kept() {
        let body = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "answer"}
            ]
        });
        assert_eq!(AnthropicAdapter::parse_text(&body).expect("parses"), "answer");
    }

    #[test]
    fn usage_is_summed() {
        let response = RawResponse::new(
            "ok",
            json!({"usage": {"input_tokens": 10, "output_tokens": 5}}),
        );
        assert_eq!(adapter().extract_usage(&response), Some(UsageStats::new(10, 5)));
    }
}
