//! Batch file round trips through the dispatcher.

use async_trait::async_trait;
use colloquy::{
    BatchReport, ColloquyErrorKind, ConcurrencyLimit, DispatchConfig, Dispatcher, FailureClass,
    ModelProfile, OPENAI_KEYWORDS, ObserverSet, Outcome, Payload, ProviderAdapter, ProviderError,
    ProviderErrorKind, RawResponse, ResultLine, RunSummary, UsageStats, classify_with,
    open_results, read_completed, read_submissions, same_file, write_results,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Echoes the conversation back, failing fatally when it contains "reject".
#[derive(Default)]
struct EchoAdapter {
    calls: AtomicUsize,
}

#[async_trait]
impl ProviderAdapter for EchoAdapter {
    fn provider_name(&self) -> &'static str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo"
    }

    async fn call(&self, payload: &Payload, _output_limit: u32) -> Result<RawResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if payload.conversation.contains("reject") {
            return Err(ProviderError::new(
                "echo",
                ProviderErrorKind::Api("content policy violation".to_string()),
            ));
        }
        Ok(RawResponse::text_only(payload.conversation.to_uppercase()))
    }

    fn classify(&self, error: &ProviderError) -> FailureClass {
        classify_with(&OPENAI_KEYWORDS, error)
    }

    fn extract_usage(&self, _response: &RawResponse) -> Option<UsageStats> {
        None
    }
}

fn dispatcher(adapter: Arc<EchoAdapter>) -> Dispatcher {
    let factory = move |_: &str, _: &ModelProfile| -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        Ok(Arc::clone(&adapter) as Arc<dyn ProviderAdapter>)
    };
    Dispatcher::new(DispatchConfig::default())
        .with_factory(factory)
        .with_observer(Arc::new(ObserverSet::new()))
}

const BATCH: &str = r#"{"id":"a","model":"gpt-4o","instructions":"Summarise.","conversation":"hello"}
{"id":"b","model":"gemini-2.5-flash","instructions":"Summarise.","conversation":"reject me"}
{"id":"c","model":"claude-sonnet-4","instructions":"Summarise.","conversation":"bye"}
"#;

#[test]
fn test_malformed_line_reports_its_number() {
    let input = "{\"id\":\"a\",\"model\":\"gpt-4o\",\"conversation\":\"x\"}\n\n{\"id\":\"b\"}\n";

    let error = read_submissions(input.as_bytes()).expect_err("missing fields");

    match error.kind() {
        ColloquyErrorKind::Json(json) => assert_eq!(json.input_line, Some(3)),
        other => panic!("expected JSON error, got {:?}", other),
    }
}

#[test]
fn test_later_result_lines_win() {
    let succeeded = ResultLine {
        id: "a".to_string(),
        outcome: Outcome::Succeeded {
            payload: "ok".to_string(),
            usage: None,
            attempts: 1,
        },
    };
    let failed = ResultLine {
        id: "b".to_string(),
        outcome: Outcome::Failed {
            last_error: "HTTP 503 error".to_string(),
            class: FailureClass::ServerError,
            attempts_made: 3,
        },
    };
    let retried = ResultLine {
        id: "b".to_string(),
        outcome: succeeded.outcome.clone(),
    };
    let lines = [&succeeded, &failed]
        .iter()
        .map(|line| serde_json::to_string(line).unwrap())
        .collect::<Vec<_>>()
        .join("\n");

    let completed = read_completed(lines.as_bytes()).unwrap();
    assert!(completed.contains("a"));
    assert!(!completed.contains("b"));

    let lines = format!("{}\n{}\n", lines, serde_json::to_string(&retried).unwrap());
    let completed = read_completed(lines.as_bytes()).unwrap();
    assert!(completed.contains("b"));
}

#[tokio::test]
async fn test_results_follow_input_order_and_resume_skips_successes() -> anyhow::Result<()> {
    let submissions = read_submissions(BATCH.as_bytes())?;
    let order: Vec<String> = submissions.iter().map(|s| s.id.clone()).collect();
    let adapter = Arc::new(EchoAdapter::default());

    let report = dispatcher(Arc::clone(&adapter))
        .dispatch(submissions.clone(), ConcurrencyLimit::Fixed(2))
        .await?;

    let mut out = Vec::new();
    let written = write_results(&mut out, &report, order.iter().map(String::as_str))?;
    assert_eq!(written, 3);

    let text = String::from_utf8(out)?;
    let lines: Vec<ResultLine> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    let ids: Vec<&str> = lines.iter().map(|line| line.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(
        lines[0].outcome,
        Outcome::Succeeded {
            payload: "HELLO".to_string(),
            usage: None,
            attempts: 1
        }
    );
    assert_eq!(lines[1].outcome.failure_class(), Some(FailureClass::Fatal));

    let completed = read_completed(text.as_bytes())?;
    assert_eq!(completed.len(), 2);

    let rerun = Arc::new(EchoAdapter::default());
    let report = dispatcher(Arc::clone(&rerun))
        .dispatch_resuming(submissions, ConcurrencyLimit::Fixed(2), &completed)
        .await?;
    assert_eq!(rerun.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(report.summary.failed, 1);

    let mut out = Vec::new();
    let written = write_results(&mut out, &report, order.iter().map(String::as_str))?;
    assert_eq!(written, 1);
    Ok(())
}

fn succeeded(id: &str) -> ResultLine {
    ResultLine {
        id: id.to_string(),
        outcome: Outcome::Succeeded {
            payload: "ok".to_string(),
            usage: None,
            attempts: 1,
        },
    }
}

fn report_with(line: &ResultLine) -> BatchReport {
    let mut summary = RunSummary::new(1);
    summary.record(&line.outcome);
    BatchReport {
        outcomes: HashMap::from([(line.id.clone(), line.outcome.clone())]),
        summary,
    }
}

#[test]
fn test_resume_file_spelled_differently_is_appended() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("runs"))?;
    let resume = dir.path().join("results.jsonl");
    std::fs::write(&resume, format!("{}\n", serde_json::to_string(&succeeded("a"))?))?;
    let output = dir.path().join("runs").join("..").join("results.jsonl");
    assert_ne!(output, resume);
    assert!(same_file(&output, &resume));

    let rerun = succeeded("b");
    write_results(open_results(&output, Some(&resume))?, &report_with(&rerun), ["b"])?;

    let completed = read_completed(std::fs::read_to_string(&resume)?.as_bytes())?;
    assert!(completed.contains("a"), "earlier success was lost");
    assert!(completed.contains("b"));
    Ok(())
}

#[test]
fn test_fresh_output_is_truncated() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let resume = dir.path().join("previous.jsonl");
    let output = dir.path().join("results.jsonl");
    std::fs::write(&resume, format!("{}\n", serde_json::to_string(&succeeded("a"))?))?;
    std::fs::write(&output, "stale line\n")?;
    assert!(!same_file(&output, &resume));
    assert!(!same_file(&dir.path().join("missing.jsonl"), &resume));

    let rerun = succeeded("b");
    write_results(open_results(&output, Some(&resume))?, &report_with(&rerun), ["b"])?;

    let completed = read_completed(std::fs::read_to_string(&output)?.as_bytes())?;
    assert_eq!(completed, ["b".to_string()].into());
    Ok(())
}
