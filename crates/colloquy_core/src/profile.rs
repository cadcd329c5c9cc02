//! Per-model retry and output configuration.

use crate::{FailureClass, ProviderKind};
use colloquy_error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts made per request when a model sets none.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// First backoff delay in seconds when a model sets none.
pub const DEFAULT_BASE_DELAY_SECS: f64 = 1.0;
/// Backoff cap in seconds when a model sets none.
pub const DEFAULT_MAX_DELAY_SECS: f64 = 30.0;
/// Per-attempt timeout in seconds when a model sets none.
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;
/// Minimum backoff in seconds after a rate-limit signal.
pub const DEFAULT_RATE_LIMIT_FLOOR_SECS: f64 = 5.0;

/// Which retryable classifications the minimum-delay floor applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FloorScope {
    /// Only `RateLimited` failures are floored
    #[default]
    RateLimited,
    /// Every retryable failure is floored
    AllRetryable,
}

impl FloorScope {
    /// Whether a retry caused by `class` must wait at least the floor.
    pub fn applies_to(&self, class: FailureClass) -> bool {
        match self {
            FloorScope::RateLimited => class == FailureClass::RateLimited,
            FloorScope::AllRetryable => class.is_retryable(),
        }
    }
}

/// Retry settings applied to models that have no explicit entry.
///
/// ```
/// use colloquy_core::RetryDefaults;
///
/// let defaults = RetryDefaults::default();
/// assert_eq!(defaults.max_retries, 3);
/// assert_eq!(defaults.timeout_secs, 60.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryDefaults {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff base in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: f64,
    /// Backoff cap in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
    /// Minimum delay in seconds for floored retries
    #[serde(default = "default_floor")]
    pub rate_limit_floor_secs: f64,
    /// Classifications the floor applies to
    #[serde(default)]
    pub floor_scope: FloorScope,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay() -> f64 {
    DEFAULT_BASE_DELAY_SECS
}

fn default_max_delay() -> f64 {
    DEFAULT_MAX_DELAY_SECS
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_floor() -> f64 {
    DEFAULT_RATE_LIMIT_FLOOR_SECS
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
            max_delay_secs: DEFAULT_MAX_DELAY_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit_floor_secs: DEFAULT_RATE_LIMIT_FLOOR_SECS,
            floor_scope: FloorScope::RateLimited,
        }
    }
}

/// Immutable configuration for one model.
///
/// Built once at startup and shared behind an `Arc` by every request that
/// targets the model.
///
/// # Examples
///
/// ```
/// use colloquy_core::{ModelProfile, ProviderKind};
///
/// let profile = ModelProfile::builder()
///     .provider(ProviderKind::Gemini)
///     .base_output_limit(20_000)
///     .build()
///     .unwrap();
///
/// assert_eq!(*profile.max_retries(), 3);
/// assert_eq!(profile.output_limit_for(1), 40_000);
/// assert_eq!(profile.output_limit_for(5), 65_536); // provider ceiling
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(pattern = "owned")]
pub struct ModelProfile {
    /// Backend serving the model
    provider: ProviderKind,
    /// Output-token limit for attempt 0
    base_output_limit: u32,
    /// Overrides the provider's hard output ceiling
    #[builder(setter(strip_option), default)]
    #[serde(default)]
    output_ceiling: Option<u32>,
    /// Total attempts per request, including the first
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    max_retries: u32,
    /// Backoff base in seconds
    #[builder(default = "DEFAULT_BASE_DELAY_SECS")]
    base_delay_secs: f64,
    /// Backoff cap in seconds
    #[builder(default = "DEFAULT_MAX_DELAY_SECS")]
    max_delay_secs: f64,
    /// Per-attempt timeout in seconds
    #[builder(default = "DEFAULT_TIMEOUT_SECS")]
    timeout_secs: f64,
    /// Minimum delay in seconds for floored retries
    #[builder(default = "DEFAULT_RATE_LIMIT_FLOOR_SECS")]
    rate_limit_floor_secs: f64,
    /// Classifications the floor applies to
    #[builder(default)]
    #[serde(default)]
    floor_scope: FloorScope,
    /// Optional request pacing, enforced before every attempt
    #[builder(setter(strip_option), default)]
    #[serde(default)]
    requests_per_minute: Option<u32>,
    /// Sampling temperature
    #[builder(default)]
    #[serde(default)]
    temperature: f32,
    /// Nucleus sampling
    #[builder(setter(strip_option), default)]
    #[serde(default)]
    top_p: Option<f32>,
    /// Top-k sampling (Gemini)
    #[builder(setter(strip_option), default)]
    #[serde(default)]
    top_k: Option<u32>,
    /// Allow the model to spend output budget on reasoning (Gemini)
    #[builder(default = "true")]
    #[serde(default = "default_thinking")]
    enable_thinking: bool,
}

fn default_thinking() -> bool {
    true
}

impl ModelProfile {
    /// Creates a new profile builder.
    pub fn builder() -> ModelProfileBuilder {
        ModelProfileBuilder::default()
    }

    /// Profile for a model with no explicit entry: provider defaults for the
    /// output limit, `defaults` for everything retry related.
    pub fn from_defaults(provider: ProviderKind, model: &str, defaults: &RetryDefaults) -> Self {
        Self {
            provider,
            base_output_limit: provider.default_base_output_limit(model),
            output_ceiling: None,
            max_retries: defaults.max_retries,
            base_delay_secs: defaults.base_delay_secs,
            max_delay_secs: defaults.max_delay_secs,
            timeout_secs: defaults.timeout_secs,
            rate_limit_floor_secs: defaults.rate_limit_floor_secs,
            floor_scope: defaults.floor_scope,
            requests_per_minute: None,
            temperature: 0.0,
            top_p: None,
            top_k: None,
            enable_thinking: true,
        }
    }

    /// Backoff base.
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.base_delay_secs)
    }

    /// Backoff cap.
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs_f64(self.max_delay_secs)
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    /// Minimum delay for floored retries.
    pub fn rate_limit_floor(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_floor_secs)
    }

    /// Effective output ceiling: the profile override, else the provider's.
    pub fn effective_ceiling(&self) -> Option<u32> {
        self.output_ceiling.or(self.provider.hard_output_ceiling())
    }

    /// Output-token limit for a 0-based attempt: `base * 2^attempt`, clamped
    /// to the effective ceiling.
    pub fn output_limit_for(&self, attempt: u32) -> u32 {
        let scaled = u64::from(self.base_output_limit).saturating_mul(2u64.saturating_pow(attempt));
        let capped = match self.effective_ceiling() {
            Some(ceiling) => scaled.min(u64::from(ceiling)),
            None => scaled,
        };
        capped.min(u64::from(u32::MAX)) as u32
    }

    /// Check that every numeric field is usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the model and the offending field.
    pub fn validate(&self, model: &str) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::invalid_field(model, "max_retries", "must be at least 1"));
        }
        if self.base_output_limit == 0 {
            return Err(ConfigError::invalid_field(
                model,
                "base_output_limit",
                "must be positive",
            ));
        }
        for (field, value) in [
            ("base_delay_secs", self.base_delay_secs),
            ("max_delay_secs", self.max_delay_secs),
            ("rate_limit_floor_secs", self.rate_limit_floor_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid_field(model, field, value));
            }
        }
        if self.max_delay_secs < self.base_delay_secs {
            return Err(ConfigError::invalid_field(
                model,
                "max_delay_secs",
                "must be >= base_delay_secs",
            ));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(ConfigError::invalid_field(model, "timeout_secs", self.timeout_secs));
        }
        if self.requests_per_minute == Some(0) {
            return Err(ConfigError::invalid_field(
                model,
                "requests_per_minute",
                "must be positive when set",
            ));
        }
        Ok(())
    }
}
