//! Metrics for batch dispatch.
//!
//! OpenTelemetry instruments on the global meter. Without an installed
//! meter provider they are no-ops.

use colloquy_core::{FailureClass, UsageStats};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<DispatchMetrics> = OnceLock::new();

/// Dispatch metrics, labelled by model.
#[derive(Clone)]
pub struct DispatchMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Provider calls made
    pub attempts: Counter<u64>,
    /// Attempts followed by a retry
    pub retries: Counter<u64>,
    /// Requests that ended failed
    pub failures: Counter<u64>,
    /// Provider call duration in seconds
    pub attempt_duration: Histogram<f64>,
    /// Tokens reported by successful calls
    pub tokens: Counter<u64>,
}

impl DispatchMetrics {
    fn init() -> Self {
        let meter = global::meter("colloquy_dispatch");

        Self {
            _meter: meter.clone(),
            attempts: meter
                .u64_counter("dispatch.attempts")
                .with_description("Provider calls made")
                .build(),
            retries: meter
                .u64_counter("dispatch.retries")
                .with_description("Failed attempts that were retried")
                .build(),
            failures: meter
                .u64_counter("dispatch.failures")
                .with_description("Requests that ended failed")
                .build(),
            attempt_duration: meter
                .f64_histogram("dispatch.attempt.duration")
                .with_unit("seconds")
                .with_description("Provider call duration")
                .build(),
            tokens: meter
                .u64_counter("dispatch.tokens")
                .with_description("Tokens reported by providers")
                .build(),
        }
    }

    /// Get the global dispatch metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record one provider call.
    pub fn record_attempt(
        &self,
        model: &str,
        class: Option<FailureClass>,
        duration_secs: f64,
        retried: bool,
    ) {
        let outcome = class.map_or_else(|| "success".to_string(), |c| c.to_string());
        let labels = &[
            KeyValue::new("model", model.to_string()),
            KeyValue::new("outcome", outcome),
        ];
        self.attempts.add(1, labels);
        self.attempt_duration.record(duration_secs, labels);
        if retried {
            self.retries.add(1, labels);
        }
    }

    /// Record a request that ended failed.
    pub fn record_failure(&self, model: &str, class: FailureClass) {
        let labels = &[
            KeyValue::new("model", model.to_string()),
            KeyValue::new("class", class.to_string()),
        ];
        self.failures.add(1, labels);
    }

    /// Record token usage from a success.
    pub fn record_tokens(&self, model: &str, usage: &UsageStats) {
        let model = model.to_string();
        self.tokens.add(
            usage.input_tokens,
            &[
                KeyValue::new("model", model.clone()),
                KeyValue::new("direction", "input"),
            ],
        );
        self.tokens.add(
            usage.output_tokens,
            &[
                KeyValue::new("model", model),
                KeyValue::new("direction", "output"),
            ],
        );
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
