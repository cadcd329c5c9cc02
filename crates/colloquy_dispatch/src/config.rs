//! Dispatch configuration.
//!
//! TOML-based configuration for retry defaults, concurrency tiers and
//! per-model profiles. Sources, later overriding earlier:
//! - Bundled defaults (include_str! from colloquy.toml)
//! - `~/.config/colloquy/colloquy.toml`
//! - `./colloquy.toml`
//!
//! A specific file can be loaded instead with [`DispatchConfig::from_file`].

use colloquy_core::{
    ConcurrencyTiers, FloorScope, ModelProfile, PayloadWeight, ProviderKind, RetryDefaults,
};
use colloquy_error::{
    BuilderError, BuilderErrorKind, ColloquyResult, ConfigError, DispatchError, DispatchErrorKind,
};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../colloquy.toml");

/// Per-model entry. Every field is optional; unset fields fall back to
/// `[defaults]` or to the provider's defaults.
///
/// ```toml
/// [models."gemini-2.5-flash"]
/// provider = "gemini"
/// temperature = 0.2
/// top_k = 40
/// enable_thinking = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ModelOverrides {
    /// Provider (inferred from the model name when omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    /// Output-token limit for the first attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_output_limit: Option<u32>,
    /// Hard output ceiling (overrides the provider's)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ceiling: Option<u32>,
    /// Total attempts per request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Backoff base in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_secs: Option<f64>,
    /// Backoff cap in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_secs: Option<f64>,
    /// Per-attempt timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    /// Minimum delay for floored retries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_floor_secs: Option<f64>,
    /// Classifications the floor applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_scope: Option<FloorScope>,
    /// Request pacing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Top-k sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Reasoning budget toggle (Gemini)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,
}

impl ModelOverrides {
    /// Resolve into a full profile, filling gaps from `defaults`.
    fn resolve(
        &self,
        provider: ProviderKind,
        model: &str,
        defaults: &RetryDefaults,
    ) -> Result<ModelProfile, BuilderError> {
        let mut builder = ModelProfile::builder()
            .provider(provider)
            .base_output_limit(
                self.base_output_limit
                    .unwrap_or_else(|| provider.default_base_output_limit(model)),
            )
            .max_retries(self.max_retries.unwrap_or(defaults.max_retries))
            .base_delay_secs(self.base_delay_secs.unwrap_or(defaults.base_delay_secs))
            .max_delay_secs(self.max_delay_secs.unwrap_or(defaults.max_delay_secs))
            .timeout_secs(self.timeout_secs.unwrap_or(defaults.timeout_secs))
            .rate_limit_floor_secs(
                self.rate_limit_floor_secs
                    .unwrap_or(defaults.rate_limit_floor_secs),
            )
            .floor_scope(self.floor_scope.unwrap_or(defaults.floor_scope))
            .temperature(self.temperature.unwrap_or_default())
            .enable_thinking(self.enable_thinking.unwrap_or(true));

        if let Some(ceiling) = self.output_ceiling {
            builder = builder.output_ceiling(ceiling);
        }
        if let Some(rpm) = self.requests_per_minute {
            builder = builder.requests_per_minute(rpm);
        }
        if let Some(top_p) = self.top_p {
            builder = builder.top_p(top_p);
        }
        if let Some(top_k) = self.top_k {
            builder = builder.top_k(top_k);
        }

        builder
            .build()
            .map_err(|e| BuilderError::new(BuilderErrorKind::ValidationFailed(e.to_string())))
    }
}

/// Top-level dispatch configuration.
///
/// Read-only after load; profiles resolved from it are shared behind `Arc`.
///
/// # Example
///
/// ```no_run
/// use colloquy_dispatch::DispatchConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DispatchConfig::load()?;
/// let profile = config.profile_for("gemini-2.5-flash")?;
/// println!("timeout: {:?}", profile.timeout());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Retry settings for models without an entry
    #[serde(default)]
    pub defaults: RetryDefaults,
    /// In-flight limits per payload weight
    #[serde(default)]
    pub concurrency: ConcurrencyTiers,
    /// Log a progress line every this many outcomes (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// Map of model name to overrides
    #[serde(default)]
    pub models: HashMap<String, ModelOverrides>,
}

fn default_progress_interval() -> usize {
    100
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            defaults: RetryDefaults::default(),
            concurrency: ConcurrencyTiers::default(),
            progress_interval: default_progress_interval(),
            models: HashMap::new(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from a specific file path, layered over the
    /// bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> ColloquyResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or validated.
    #[instrument]
    pub fn load() -> ColloquyResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/colloquy/colloquy.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("colloquy").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Bundled defaults only, ignoring user files.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled file is invalid.
    pub fn bundled() -> ColloquyResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check tiers and every listed model.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> ColloquyResult<()> {
        for (name, limit) in [
            ("heavy", self.concurrency.heavy),
            ("normal", self.concurrency.normal),
            ("default", self.concurrency.default),
        ] {
            if limit == 0 {
                return Err(ConfigError::new(format!(
                    "concurrency.{} must be at least 1",
                    name
                ))
                .into());
            }
        }
        ModelProfile::from_defaults(ProviderKind::OpenAi, "defaults", &self.defaults)
            .validate("[defaults]")?;
        for model in self.models.keys() {
            self.profile_for(model)?;
        }
        Ok(())
    }

    /// Resolve the profile for a model.
    ///
    /// Listed models get their overrides applied over `[defaults]`; unlisted
    /// models use `[defaults]` with the provider inferred from the name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if the model is unlisted and no provider can be
    /// inferred, or a configuration error if the resolved profile is invalid.
    pub fn profile_for(&self, model: &str) -> ColloquyResult<Arc<ModelProfile>> {
        let overrides = self.models.get(model);
        let provider = overrides
            .and_then(|o| o.provider)
            .or_else(|| ProviderKind::infer(model))
            .ok_or_else(|| DispatchError::new(DispatchErrorKind::UnknownModel(model.to_string())))?;

        let profile = match overrides {
            Some(overrides) => overrides.resolve(provider, model, &self.defaults)?,
            None => ModelProfile::from_defaults(provider, model, &self.defaults),
        };
        profile.validate(model)?;
        Ok(Arc::new(profile))
    }

    /// In-flight limit for a payload weight.
    pub fn limit_for(&self, weight: PayloadWeight) -> usize {
        self.concurrency.limit_for(weight)
    }

    /// Names of explicitly configured models, sorted.
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_is_valid() {
        let config = DispatchConfig::bundled().expect("bundled config loads");
        assert_eq!(config.defaults, RetryDefaults::default());
        assert_eq!(config.concurrency, ConcurrencyTiers::default());
        assert_eq!(config.progress_interval, 100);
        assert!(config.models.contains_key("gemini-2.5-flash"));
    }

    #[test]
    fn listed_model_applies_overrides() {
        let config = DispatchConfig::bundled().expect("bundled config loads");
        let profile = config.profile_for("gemini-2.5-flash").expect("resolves");
        assert_eq!(*profile.provider(), ProviderKind::Gemini);
        assert_eq!(*profile.base_output_limit(), 20_000);
        assert_eq!(*profile.top_k(), Some(40));
        assert!(!*profile.enable_thinking());
        assert_eq!(*profile.max_retries(), 3);
    }

    #[test]
    fn unlisted_model_infers_provider() {
        let config = DispatchConfig::default();
        let profile = config.profile_for("claude-sonnet-4-5").expect("resolves");
        assert_eq!(*profile.provider(), ProviderKind::Anthropic);
        assert_eq!(*profile.timeout_secs(), 60.0);
    }

    #[test]
    fn unknown_model_is_rejected() {
        let config = DispatchConfig::default();
        let err = config.profile_for("llama-3-70b").unwrap_err();
        assert!(err.to_string().contains("llama-3-70b"));
    }
}
