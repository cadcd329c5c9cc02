//! End-to-end batch dispatch against a scripted adapter.

mod test_utils;

use colloquy_core::{
    FailureClass, ModelProfile, Outcome, Payload, PayloadWeight, ProviderKind, Submission,
    UsageStats,
};
use colloquy_dispatch::{
    ConcurrencyLimit, DispatchConfig, Dispatcher, ModelOverrides, ObserverSet,
};
use colloquy_error::{ColloquyErrorKind, DispatchErrorKind, ProviderError, ProviderErrorKind};
use colloquy_models::ProviderAdapter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use test_utils::{ScriptedAdapter, ScriptedFactory, Step};

fn submission(id: &str, conversation: &str) -> Submission {
    Submission::new(id, Payload::new("Summarise.", conversation), "gpt-4o")
}

fn dispatcher(adapter: &Arc<ScriptedAdapter>) -> Dispatcher {
    Dispatcher::new(DispatchConfig::default())
        .with_factory(ScriptedFactory(Arc::clone(adapter)))
        .with_observer(Arc::new(ObserverSet::new()))
}

fn dispatch_kind(error: &colloquy_error::ColloquyError) -> Option<&DispatchErrorKind> {
    match error.kind() {
        ColloquyErrorKind::Dispatch(inner) => Some(&inner.kind),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_fatal_request_does_not_affect_the_rest() {
    let adapter = Arc::new(
        ScriptedAdapter::new()
            .script("conv-5", vec![Step::Fail("invalid api key".into())])
            .script("conv-2", vec![Step::Status(503), Step::Succeed("late".into())]),
    );
    let batch: Vec<Submission> = (0..10)
        .map(|n| submission(&format!("chat-{}", n), &format!("conv-{}", n)))
        .collect();

    let start = Instant::now();

    let report = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(10))
        .await
        .expect("batch dispatches");

    assert_eq!(report.outcomes.len(), 10);
    assert_eq!(report.summary.succeeded, 9);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.total_attempts, 11);
    assert_eq!(
        report.summary.failures_by_class.get(&FailureClass::Fatal),
        Some(&1)
    );
    assert_eq!(
        report.outcome("chat-5").and_then(Outcome::failure_class),
        Some(FailureClass::Fatal)
    );
    assert_eq!(report.outcome("chat-2").map(Outcome::attempts), Some(2));
    assert!(report.outcome("chat-7").is_some_and(Outcome::is_success));

    // Neither the fatal item nor the retrying one delays its siblings.
    for n in 0..10 {
        let calls = adapter.calls_for(&format!("conv-{}", n));
        assert_eq!(calls[0].started, start, "conv-{} started late", n);
        if n != 2 {
            assert_eq!(calls.len(), 1, "conv-{} was retried", n);
        }
    }
    assert!(adapter.calls_for("conv-2")[1].started > start);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_dispatch_stops_outstanding_requests() {
    let mut adapter = ScriptedAdapter::new();
    for n in 0..4 {
        adapter = adapter.script(
            format!("conv-{}", n),
            vec![Step::SucceedAfter(Duration::from_secs(10), "done".into())],
        );
    }
    let adapter = Arc::new(adapter);
    let batch: Vec<Submission> = (0..4)
        .map(|n| submission(&format!("chat-{}", n), &format!("conv-{}", n)))
        .collect();
    let dispatcher = dispatcher(&adapter);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.dispatch(batch, ConcurrencyLimit::Fixed(1)),
    )
    .await;
    assert!(result.is_err(), "dispatch finished before the deadline");
    assert_eq!(adapter.call_count(), 1);

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(adapter.call_count(), 1);
    assert_eq!(adapter.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_gate_bounds_in_flight_requests() {
    let steps = || vec![Step::SucceedAfter(Duration::from_secs(10), "done".into())];
    let mut adapter = ScriptedAdapter::new();
    for n in 0..5 {
        adapter = adapter.script(format!("conv-{}", n), steps());
    }
    let adapter = Arc::new(adapter);
    let batch: Vec<Submission> = (0..5)
        .map(|n| submission(&format!("chat-{}", n), &format!("conv-{}", n)))
        .collect();

    let report = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(2))
        .await
        .expect("batch dispatches");

    assert_eq!(report.summary.succeeded, 5);
    assert_eq!(adapter.max_in_flight(), 2);

    let mut starts: Vec<_> = adapter.calls().iter().map(|call| call.started).collect();
    starts.sort();
    assert_eq!(starts.len(), 5);
    // The third call can only start once one of the first two releases its permit.
    assert!(starts[2] - starts[0] >= Duration::from_secs(10));
    assert!(starts[4] - starts[0] >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_permit_is_held_through_backoff() {
    let adapter = Arc::new(
        ScriptedAdapter::new()
            .script("slow", vec![Step::Status(503), Step::Succeed("ok".into())])
            .script("fast", vec![Step::Succeed("ok".into())]),
    );
    let batch = vec![submission("a", "slow"), submission("b", "fast")];

    let report = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(1))
        .await
        .expect("batch dispatches");

    assert_eq!(report.summary.succeeded, 2);
    let slow = adapter.calls_for("slow");
    let fast = adapter.calls_for("fast");
    assert_eq!(slow.len(), 2);
    assert_eq!(fast.len(), 1);
    // With one permit, "fast" runs either before "slow" starts or after it finishes.
    let fast_start = fast[0].started;
    assert!(fast_start <= slow[0].started || fast_start >= slow[1].started);
}

#[tokio::test(start_paused = true)]
async fn test_weight_tier_sets_the_limit() {
    let mut adapter = ScriptedAdapter::new();
    for n in 0..20 {
        adapter = adapter.script(
            format!("conv-{}", n),
            vec![Step::SucceedAfter(Duration::from_secs(1), "done".into())],
        );
    }
    let adapter = Arc::new(adapter);
    let batch: Vec<Submission> = (0..20)
        .map(|n| submission(&format!("chat-{}", n), &format!("conv-{}", n)))
        .collect();

    let report = dispatcher(&adapter)
        .dispatch(batch, PayloadWeight::Heavy.into())
        .await
        .expect("batch dispatches");

    assert_eq!(report.summary.succeeded, 20);
    assert_eq!(adapter.max_in_flight(), 10);
}

#[tokio::test]
async fn test_zero_concurrency_is_rejected() {
    let adapter = Arc::new(ScriptedAdapter::new());

    let error = dispatcher(&adapter)
        .dispatch(vec![submission("a", "conv")], ConcurrencyLimit::Fixed(0))
        .await
        .expect_err("zero limit rejected");

    assert_eq!(
        dispatch_kind(&error),
        Some(&DispatchErrorKind::InvalidConcurrency(0))
    );
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_ids_are_rejected_before_any_call() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let batch = vec![
        submission("a", "one"),
        submission("b", "two"),
        submission("a", "three"),
    ];

    let error = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(2))
        .await
        .expect_err("duplicate rejected");

    assert_eq!(
        dispatch_kind(&error),
        Some(&DispatchErrorKind::DuplicateId("a".to_string()))
    );
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_model_is_rejected_before_any_call() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let batch = vec![
        submission("a", "one"),
        Submission::new("b", Payload::new("Summarise.", "two"), "mystery-model"),
    ];

    let error = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(2))
        .await
        .expect_err("unknown model rejected");

    assert_eq!(
        dispatch_kind(&error),
        Some(&DispatchErrorKind::UnknownModel("mystery-model".to_string()))
    );
    assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_adapter_configuration_failure_rejects_batch() {
    let factory = |_: &str, _: &ModelProfile| -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        Err(ProviderError::new(
            "openai",
            ProviderErrorKind::MissingApiKey("OPENAI_API_KEY".to_string()),
        ))
    };
    let dispatcher = Dispatcher::new(DispatchConfig::default()).with_factory(factory);

    let error = dispatcher
        .dispatch(vec![submission("a", "conv")], ConcurrencyLimit::Fixed(1))
        .await
        .expect_err("missing key rejected");

    assert!(error.to_string().contains("OPENAI_API_KEY"));
}

#[tokio::test(start_paused = true)]
async fn test_resume_skips_completed_ids() {
    let adapter = Arc::new(ScriptedAdapter::new());
    let batch = vec![
        submission("a", "one"),
        submission("b", "two"),
        submission("c", "three"),
    ];
    let completed: HashSet<String> = ["a".to_string(), "c".to_string()].into();

    let report = dispatcher(&adapter)
        .dispatch_resuming(batch, ConcurrencyLimit::Fixed(2), &completed)
        .await
        .expect("batch dispatches");

    assert_eq!(adapter.call_count(), 1);
    assert_eq!(adapter.calls()[0].key, "two");
    assert_eq!(report.summary.submitted, 1);
    assert_eq!(report.summary.skipped, 2);
    assert!(report.outcome("a").is_none());
    assert!(report.outcome("b").is_some_and(Outcome::is_success));
}

#[tokio::test(start_paused = true)]
async fn test_usage_is_accumulated_across_the_batch() {
    let adapter = Arc::new(ScriptedAdapter::new().with_usage(UsageStats::new(100, 20)));
    let batch: Vec<Submission> = (0..3)
        .map(|n| submission(&format!("chat-{}", n), &format!("conv-{}", n)))
        .collect();

    let report = dispatcher(&adapter)
        .dispatch(batch, ConcurrencyLimit::Fixed(3))
        .await
        .expect("batch dispatches");

    assert_eq!(report.summary.usage, UsageStats::new(300, 60));
    assert_eq!(report.summary.usage_reported, 3);
    let tokens = report.summary.token_report().expect("usage reported");
    assert!(tokens.contains("360 total tokens"));
}

#[tokio::test(start_paused = true)]
async fn test_per_model_profile_controls_retries() {
    let mut config = DispatchConfig::default();
    config.models.insert(
        "gpt-4o".to_string(),
        ModelOverrides {
            provider: Some(ProviderKind::OpenAi),
            base_output_limit: Some(500),
            max_retries: Some(2),
            ..Default::default()
        },
    );
    let adapter = Arc::new(
        ScriptedAdapter::new().script("conv", vec![Step::Status(503), Step::Status(503)]),
    );
    let dispatcher = Dispatcher::new(config)
        .with_factory(ScriptedFactory(Arc::clone(&adapter)))
        .with_observer(Arc::new(ObserverSet::new()));

    let report = dispatcher
        .dispatch(vec![submission("a", "conv")], ConcurrencyLimit::Fixed(1))
        .await
        .expect("batch dispatches");

    let outcome = report.outcome("a").expect("recorded");
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.failure_class(), Some(FailureClass::ServerError));
    let limits: Vec<u32> = adapter.calls().iter().map(|c| c.output_limit).collect();
    assert_eq!(limits, vec![500, 1_000]);
}
