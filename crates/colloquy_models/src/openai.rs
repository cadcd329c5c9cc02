//! OpenAI chat completions adapter.

use crate::classify::{OPENAI_KEYWORDS, classify_with};
use crate::transport::{api_key_from_env, http_client, post_json, reject_error_body};
use crate::{ProviderAdapter, RawResponse};
use async_trait::async_trait;
use colloquy_core::{FailureClass, ModelProfile, Payload, ProviderKind, UsageStats};
use colloquy_error::{ProviderError, ProviderErrorKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";

/// True for OpenAI reasoning models (`o1`, `o3`, `o4` families), which take
/// `max_completion_tokens` and reject sampling parameters.
///
/// ```
/// use colloquy_models::is_reasoning_model;
///
/// assert!(is_reasoning_model("o4-mini"));
/// assert!(!is_reasoning_model("gpt-4o"));
/// ```
pub fn is_reasoning_model(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    ["o1", "o3", "o4"].iter().any(|prefix| model.starts_with(prefix))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Chat completions request body.
#[derive(Debug, Clone, PartialEq, Serialize, derive_getters::Getters)]
pub struct OpenAiRequest {
    /// Model identifier
    model: String,
    /// System then user message
    #[getter(skip)]
    messages: Vec<OpenAiMessage>,
    /// Output limit for classic models
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Output limit for reasoning models
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    /// Sampling temperature (classic models only)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Nucleus sampling (classic models only)
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
}

/// OpenAI chat completions adapter.
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    top_p: Option<f32>,
}

impl OpenAiAdapter {
    /// Creates an adapter, reading the key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unset or the HTTP client cannot be built.
    pub fn new(model: impl Into<String>, profile: &ModelProfile) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(PROVIDER, ProviderKind::OpenAi.api_key_var())?;
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
        debug!(model = %model, "Creating OpenAI adapter");
        Ok(Self {
            client: http_client(PROVIDER)?,
            api_key: api_key.into(),
            model,
            base_url: OPENAI_API_URL.to_string(),
            temperature: *profile.temperature(),
            top_p: *profile.top_p(),
        })
    }

    /// Point the adapter at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shape the request for one attempt.
    ///
    /// Instructions become the system message, the conversation the user
    /// message. Reasoning models get `max_completion_tokens` and no sampling
    /// parameters.
    pub fn build_request(&self, payload: &Payload, output_limit: u32) -> OpenAiRequest {
        let messages = vec![
            OpenAiMessage {
                role: "system".to_string(),
                content: payload.instructions.clone(),
            },
            OpenAiMessage {
                role: "user".to_string(),
                content: payload.conversation.clone(),
            },
        ];

        if is_reasoning_model(&self.model) {
            OpenAiRequest {
                model: self.model.clone(),
                messages,
                max_tokens: None,
                max_completion_tokens: Some(output_limit),
                temperature: None,
                top_p: None,
            }
        } else {
            OpenAiRequest {
                model: self.model.clone(),
                messages,
                max_tokens: Some(output_limit),
                max_completion_tokens: None,
                temperature: Some(self.temperature),
                top_p: self.top_p,
            }
        }
    }

    fn parse_text(body: &serde_json::Value) -> Result<String, ProviderError> {
        reject_error_body(PROVIDER, body)?;
        let response: OpenAiResponse = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::new(PROVIDER, ProviderErrorKind::Parse(e.to_string())))?;
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ProviderError::new(
                PROVIDER,
                ProviderErrorKind::Parse("response contained no choices".to_string()),
            )
        })?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
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
        let url = format!("{}/chat/completions", self.base_url);
        let body = post_json(
            PROVIDER,
            self.client.post(&url).bearer_auth(&self.api_key),
            &request,
        )
        .await?;
        let text = Self::parse_text(&body)?;
        debug!(chars = text.len(), "Received OpenAI response");
        Ok(RawResponse::new(text, body))
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        classify_with(&OPENAI_KEYWORDS, error)
    }

    fn extract_usage(&self, response: &RawResponse) -> Option<UsageStats> {
        let usage: OpenAiUsage = serde_json::from_value(response.body().get("usage")?.clone()).ok()?;
        Some(match usage.total_tokens {
            Some(total) => UsageStats::with_total(usage.prompt_tokens, usage.completion_tokens, total),
            None => UsageStats::new(usage.prompt_tokens, usage.completion_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter(model: &str) -> OpenAiAdapter {
        let profile = ModelProfile::builder()
            .provider(ProviderKind::OpenAi)
            .base_output_limit(16_000)
            .temperature(0.2)
            .build()
            .expect("valid profile");
        OpenAiAdapter::with_api_key("sk-test", model, &profile).expect("client builds")
    }

    #[test]
    fn classic_model_uses_max_tokens() {
        let request = adapter("gpt-4o").build_request(&Payload::new("Analyse", "user: hi"), 16_000);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["max_tokens"], 16_000);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Analyse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "user: hi");
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn reasoning_model_uses_max_completion_tokens() {
        let request = adapter("o4-mini").build_request(&Payload::new("Analyse", "hi"), 60_000);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["max_completion_tokens"], 60_000);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn null_content_is_empty_text() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        assert_eq!(OpenAiAdapter::parse_text(&body).expect("parses"), "");
    }

    #[test]
    fn error_object_in_body_is_api_error() {
        let body = json!({"error": {"message": "Rate limit reached", "type": "rate_limit_exceeded"}});
        let err = OpenAiAdapter::parse_text(&body).unwrap_err();
        assert_eq!(adapter("gpt-4o").classify(&err), FailureClass::RateLimited);
    }

    #[test]
    fn usage_is_extracted() {
        let response = RawResponse::new(
            "ok",
            json!({"usage": {"prompt_tokens": 1200, "completion_tokens": 300, "total_tokens": 1500}}),
        );
        assert_eq!(
            adapter("gpt-4o").extract_usage(&response),
            Some(UsageStats::new(1200, 300))
        );
        assert_eq!(
            adapter("gpt-4o").extract_usage(&RawResponse::text_only("ok")),
            None
        );
    }
}
