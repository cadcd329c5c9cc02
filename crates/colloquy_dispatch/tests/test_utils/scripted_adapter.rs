//! Scripted provider adapter for testing.

use async_trait::async_trait;
use colloquy_core::{FailureClass, ModelProfile, Payload, UsageStats};
use colloquy_dispatch::AdapterFactory;
use colloquy_error::{ProviderError, ProviderErrorKind};
use colloquy_models::{OPENAI_KEYWORDS, ProviderAdapter, RawResponse, classify_with};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted call.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Step {
    /// Return this text immediately
    Succeed(String),
    /// Return this text after a simulated call duration
    SucceedAfter(Duration, String),
    /// Fail with this error text (classified with the OpenAI keyword table)
    Fail(String),
    /// Fail with an HTTP status
    Status(u16),
    /// Never answer; only the attempt timeout ends the call
    Hang,
}

/// A call observed by the adapter.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct CallRecord {
    /// Conversation text, used as the script key
    pub key: String,
    /// Output limit requested
    pub output_limit: u32,
    /// When the call started
    pub started: Instant,
}

/// Replays per-conversation scripts.
///
/// Each payload's conversation text selects a script; the n-th call for that
/// conversation plays the n-th step. Conversations without a script, and
/// calls past the end of one, succeed with `"ok"`.
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    scripts: Mutex<HashMap<String, Vec<Step>>>,
    calls_per_key: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    usage: Option<UsageStats>,
}

#[allow(dead_code)]
impl ScriptedAdapter {
    /// Adapter where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script for a conversation.
    pub fn script(self, conversation: impl Into<String>, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(conversation.into(), steps);
        self
    }

    /// Report this usage on every success.
    pub fn with_usage(mut self, usage: UsageStats) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Every call made, in start order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for one conversation.
    pub fn calls_for(&self, conversation: &str) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|call| call.key == conversation)
            .collect()
    }

    /// Total calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Most calls ever in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, key: &str) -> Step {
        let mut counts = self.calls_per_key.lock().unwrap();
        let n = counts.entry(key.to_string()).or_insert(0);
        let index = *n;
        *n += 1;
        self.scripts
            .lock()
            .unwrap()
            .get(key)
            .and_then(|steps| steps.get(index).cloned())
            .unwrap_or_else(|| Step::Succeed("ok".to_string()))
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn call(
        &self,
        payload: &Payload,
        output_limit: u32,
    ) -> Result<RawResponse, ProviderError> {
        let key = payload.conversation.clone();
        self.calls.lock().unwrap().push(CallRecord {
            key: key.clone(),
            output_limit,
            started: Instant::now(),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.next_step(&key) {
            Step::Succeed(text) => Ok(RawResponse::text_only(text)),
            Step::SucceedAfter(duration, text) => {
                tokio::time::sleep(duration).await;
                Ok(RawResponse::text_only(text))
            }
            Step::Fail(message) => Err(ProviderError::new(
                "scripted",
                ProviderErrorKind::Api(message),
            )),
            Step::Status(status_code) => Err(ProviderError::new(
                "scripted",
                ProviderErrorKind::Http {
                    status_code,
                    message: String::new(),
                },
            )),
            Step::Hang => {
                std::future::pending::<()>().await;
                Ok(RawResponse::text_only("unreachable"))
            }
        }
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        classify_with(&OPENAI_KEYWORDS, error)
    }

    fn extract_usage(&self, _response: &RawResponse) -> Option<UsageStats> {
        self.usage
    }
}

/// Hands the same scripted adapter to every model.
#[derive(Debug, Clone)]
pub struct ScriptedFactory(pub Arc<ScriptedAdapter>);

impl AdapterFactory for ScriptedFactory {
    fn adapter_for(
        &self,
        _model: &str,
        _profile: &ModelProfile,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        Ok(Arc::clone(&self.0) as Arc<dyn ProviderAdapter>)
    }
}
