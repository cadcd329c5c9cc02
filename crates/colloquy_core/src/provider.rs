//! The closed set of supported LLM providers.

use serde::{Deserialize, Serialize};

/// LLM backend a model is served by.
///
/// # Examples
///
/// ```
/// use colloquy_core::ProviderKind;
/// use std::str::FromStr;
///
/// assert_eq!(ProviderKind::from_str("gemini").unwrap(), ProviderKind::Gemini);
/// assert_eq!(ProviderKind::infer("gpt-4o-mini"), Some(ProviderKind::OpenAi));
/// assert_eq!(ProviderKind::infer("llama-3"), None);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini `generateContent`
    Gemini,
    /// Anthropic messages
    Anthropic,
}

impl ProviderKind {
    /// Stable lowercase name, used in logs, metrics and error attribution.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Guess the provider from a model name, for models without a profile.
    pub fn infer(model: &str) -> Option<Self> {
        let model = model.to_ascii_lowercase();
        if model.starts_with("gpt")
            || model.starts_with("chatgpt")
            || ["o1", "o3", "o4"].iter().any(|p| model.starts_with(p))
        {
            Some(ProviderKind::OpenAi)
        } else if model.starts_with("gemini") {
            Some(ProviderKind::Gemini)
        } else if model.starts_with("claude") {
            Some(ProviderKind::Anthropic)
        } else {
            None
        }
    }

    /// Output-token limit used on the first attempt when a profile sets none.
    ///
    /// OpenAI reasoning models spend part of the budget thinking and get a
    /// larger allowance.
    pub fn default_base_output_limit(&self, model: &str) -> u32 {
        match self {
            ProviderKind::OpenAi if model.contains("o3") || model.contains("o4") => 30_000,
            ProviderKind::OpenAi => 16_000,
            ProviderKind::Gemini => 20_000,
            ProviderKind::Anthropic => 16_000,
        }
    }

    /// Largest output limit the provider accepts.
    pub fn hard_output_ceiling(&self) -> Option<u32> {
        match self {
            ProviderKind::OpenAi => Some(100_000),
            ProviderKind::Gemini => Some(65_536),
            ProviderKind::Anthropic => Some(64_000),
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn infers_reasoning_models_as_openai() {
        assert_eq!(ProviderKind::infer("o4-mini"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::infer("o3"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::infer("GPT-4o"), Some(ProviderKind::OpenAi));
    }

    #[test]
    fn infers_gemini_and_claude() {
        assert_eq!(ProviderKind::infer("gemini-2.5-pro"), Some(ProviderKind::Gemini));
        assert_eq!(
            ProviderKind::infer("claude-3-5-sonnet-20241022"),
            Some(ProviderKind::Anthropic)
        );
    }

    #[test]
    fn base_limits_follow_model_family() {
        assert_eq!(ProviderKind::OpenAi.default_base_output_limit("o4-mini"), 30_000);
        assert_eq!(ProviderKind::OpenAi.default_base_output_limit("gpt-4o"), 16_000);
        assert_eq!(ProviderKind::Gemini.default_base_output_limit("gemini-1.5-pro"), 20_000);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(ProviderKind::from_str("OpenAI").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
