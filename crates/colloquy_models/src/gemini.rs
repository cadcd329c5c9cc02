//! Gemini `generateContent` adapter.

use crate::classify::{GEMINI_KEYWORDS, classify_with};
use crate::transport::{api_key_from_env, http_client, post_json, reject_error_body};
use crate::{ProviderAdapter, RawResponse};
use async_trait::async_trait;
use colloquy_core::{FailureClass, ModelProfile, Payload, ProviderKind, UsageStats};
use colloquy_error::{ProviderError, ProviderErrorKind};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "gemini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

/// `generateContent` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

impl GeminiRequest {
    /// Output limit requested.
    pub fn max_output_tokens(&self) -> u32 {
        self.generation_config.max_output_tokens
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
    #[serde(default)]
    total_token_count: Option<u64>,
}

/// Gemini `generateContent` adapter.
#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    top_p: Option<f32>,
    top_k: Option<u32>,
    enable_thinking: bool,
}

impl GeminiAdapter {
    /// Creates an adapter, reading the key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unset or the HTTP client cannot be built.
    pub fn new(model: impl Into<String>, profile: &ModelProfile) -> Result<Self, ProviderError> {
        let api_key = api_key_from_env(PROVIDER, ProviderKind::Gemini.api_key_var())?;
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
        debug!(model = %model, "Creating Gemini adapter");
        Ok(Self {
            client: http_client(PROVIDER)?,
            api_key: api_key.into(),
            model,
            base_url: GEMINI_API_URL.to_string(),
            temperature: *profile.temperature(),
            top_p: *profile.top_p(),
            top_k: *profile.top_k(),
            enable_thinking: *profile.enable_thinking(),
        })
    }

    /// Point the adapter at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Shape the request for one attempt.
    ///
    /// Gemini takes a single user turn, so instructions and conversation are
    /// joined. A zero thinking budget is sent when thinking is disabled.
    pub fn build_request(&self, payload: &Payload, output_limit: u32) -> GeminiRequest {
        let text = format!(
            "{}\n\nUser conversation:\n{}",
            payload.instructions, payload.conversation
        );
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: Some(text) }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: output_limit,
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                thinking_config: (!self.enable_thinking)
                    .then_some(ThinkingConfig { thinking_budget: 0 }),
            },
        }
    }

    fn parse_text(body: &serde_json::Value) -> Result<String, ProviderError> {
        reject_error_body(PROVIDER, body)?;
        let response: GeminiResponse = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::new(PROVIDER, ProviderErrorKind::Parse(e.to_string())))?;

        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ProviderError::new(
                PROVIDER,
                ProviderErrorKind::Api(format!("prompt blocked: {}", reason)),
            ));
        }

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Err(ProviderError::new(
                PROVIDER,
                ProviderErrorKind::Parse("response contained no candidates".to_string()),
            ));
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            warn!(
                finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
                "Gemini candidate carried no text"
            );
        }
        Ok(text)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = post_json(
            PROVIDER,
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key),
            &request,
        )
        .await?;
        let text = Self::parse_text(&body)?;
        debug!(chars = text.len(), "Received Gemini response");
        Ok(RawResponse::new(text, body))
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        classify_with(&GEMINI_KEYWORDS, error)
    }

    fn extract_usage(&self, response: &RawResponse) -> Option<UsageStats> {
        let usage: UsageMetadata =
            serde_json::from_value(response.body().get("usageMetadata")?.clone()).ok()?;
        let output = usage.candidates_token_count + usage.thoughts_token_count;
        Some(match usage.total_token_count {
            Some(total) => UsageStats::with_total(usage.prompt_token_count, output, total),
            None => UsageStats::new(usage.prompt_token_count, output),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter(enable_thinking: bool) -> GeminiAdapter {
        let profile = ModelProfile::builder()
            .provider(ProviderKind::Gemini)
            .base_output_limit(20_000)
            .temperature(0.2)
            .top_p(1.0)
            .top_k(40)
            .enable_thinking(enable_thinking)
            .build()
            .expect("valid profile");
        GeminiAdapter::with_api_key("key", "gemini-2.5-flash", &profile).expect("client builds")
    }

    #[test]
    fn prompt_and_conversation_are_joined() {
        let request = adapter(true).build_request(&Payload::new("Rate it", "user: hi"), 20_000);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "Rate it\n\nUser conversation:\nuser: hi"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 20_000);
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn disabled_thinking_sends_zero_budget() {
        let request = adapter(false).build_request(&Payload::new("p", "c"), 40_000);
        let body = serde_json::to_value(&request).expect("serializes");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
        assert_eq!(request.max_output_tokens(), 40_000);
    }

    #[test]
    fn parts_are_concatenated() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(GeminiAdapter::parse_text(&body).expect("parses"), "Hello, world");
    }

    #[test]
    fn max_tokens_without_content_is_empty_success() {
        let body = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
        assert_eq!(GeminiAdapter::parse_text(&body).expect("parses"), "");
    }

    #[test]
    fn blocked_prompt_is_fatal() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiAdapter::parse_text(&body).unwrap_err();
        assert_eq!(adapter(true).classify(&err), FailureClass::Fatal);
    }

    #[test]
    fn usage_counts_thoughts_as_output() {
        let response = RawResponse::new(
            "ok",
            json!({"usageMetadata": {
                "promptTokenCount": 900,
                "candidatesTokenCount": 100,
                "thoughtsTokenCount": 50,
                "totalTokenCount": 1050
            }}),
        );
        assert_eq!(
            adapter(true).extract_usage(&response),
            Some(UsageStats::with_total(900, 150, 1050))
        );
    }
}
