//! Integration tests for the résumé pipeline.
//!
//! The model is replaced by a scripted [`CompletionClient`], so nothing here
//! needs an API key or network access. Tests that build or read real PDFs
//! need the native pdfium library and skip themselves unless it is already
//! available (cached by a previous run, or `PDFIUM_LIB_PATH` set).
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use resume_pipeline::{
    persist_document, render_document, Pipeline, PipelineConfig, PipelineError,
    PipelineProgressCallback, RenderStyle, SourceDocument, Stage, StructuredResult, TaskKind,
    TaskRequest,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

type Script = Box<dyn Fn(&str) -> Result<String, PipelineError> + Send + Sync>;

/// Answers every prompt with `script(prompt)` and records what it was sent.
struct ScriptedClient {
    script: Script,
    calls: Mutex<Vec<(String, f32)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl ScriptedClient {
    fn new(script: impl Fn(&str) -> Result<String, PipelineError> + Send + Sync + 'static) -> Arc<Self> {
        Self::with_delay(Duration::ZERO, script)
    }

    fn replying(answer: &str) -> Arc<Self> {
        let answer = answer.to_string();
        Self::new(move |_| Ok(answer.clone()))
    }

    fn with_delay(
        delay: Duration,
        script: impl Fn(&str) -> Result<String, PipelineError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> (String, f32) {
        self.calls.lock().unwrap().last().cloned().expect("no calls recorded")
    }
}

#[async_trait]
impl resume_pipeline::CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, PipelineError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.script)(prompt)
    }
}

/// Records progress events as strings.
#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl PipelineProgressCallback for EventLog {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start:{stage}"));
    }

    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.events.lock().unwrap().push(format!("done:{stage}"));
    }

    fn on_stage_error(&self, stage: Stage, _error: String) {
        self.events.lock().unwrap().push(format!("error:{stage}"));
    }
}

fn pipeline_with(client: Arc<ScriptedClient>, concurrency: usize) -> Pipeline {
    let config = PipelineConfig::builder()
        .concurrency(concurrency)
        .build()
        .unwrap();
    Pipeline::new(config, client)
}

/// Skip this test unless pdfium can be bound without a download.
macro_rules! skip_unless_pdfium {
    () => {{
        if !pdfium_auto::is_pdfium_cached() {
            println!("SKIP — pdfium not available; set PDFIUM_LIB_PATH to run");
            return;
        }
    }};
}

const RESUME_TEXT: &str = "Jane Doe\n\
Summary:\n\
Backend engineer with six years of distributed systems work.\n\
\n\
Skills\n\
Go, Kafka, PostgreSQL\n\
\n\
Experience:\n\
Built 3 microservices using distributed queues.\n\
\n\
Certifications\n\
CKA";

/// A real PDF containing `text`, produced by the renderer.
async fn resume_pdf(name: &str, text: &str) -> SourceDocument {
    let doc = render_document(text, &RenderStyle::default())
        .await
        .expect("fixture render failed");
    SourceDocument::new(name, doc.bytes)
}

// ── Input validation (no pdfium needed) ──────────────────────────────────────

#[tokio::test]
async fn missing_target_is_rejected_before_the_model_is_called() {
    let client = ScriptedClient::replying("{}");
    let pipeline = pipeline_with(client.clone(), 2);
    let doc = SourceDocument::new("cv.pdf", b"%PDF-1.4 not really".to_vec());

    let err = pipeline
        .run(&TaskRequest {
            kind: TaskKind::Compare,
            document: doc.clone(),
            target: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::IncompleteTaskInput {
            task: TaskKind::Compare,
            field: "target description"
        }
    ));

    let err = pipeline.optimize(&doc, " \n\t").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::IncompleteTaskInput {
            task: TaskKind::Optimize,
            ..
        }
    ));
    assert!(err.is_rejection());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn non_pdf_bytes_fail_in_extract_stage() {
    let log = Arc::new(EventLog::default());
    let client = ScriptedClient::replying("{}");
    let config = PipelineConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, client.clone());

    let doc = SourceDocument::new("photo.png", b"\x89PNG\r\n\x1a\n....".to_vec());
    let err = pipeline.summarize(&doc).await.unwrap_err();
    assert!(matches!(err, PipelineError::MalformedDocument { .. }));
    assert_eq!(client.call_count(), 0);
    assert_eq!(
        *log.events.lock().unwrap(),
        vec!["start:extract".to_string(), "error:extract".to_string()]
    );
}

#[tokio::test]
async fn run_many_keeps_failures_in_place() {
    let client = ScriptedClient::replying("{}");
    let pipeline = pipeline_with(client.clone(), 3);
    let garbage = SourceDocument::new("a.pdf", b"nope".to_vec());

    let requests = vec![
        TaskRequest::summarize(garbage.clone()),
        TaskRequest {
            kind: TaskKind::Optimize,
            document: garbage.clone(),
            target: None,
        },
        TaskRequest::compare(garbage, "Data engineer"),
    ];
    let results = pipeline.run_many(&requests).await;

    assert_eq!(results.len(), 3);
    assert!(matches!(results[0], Err(PipelineError::MalformedDocument { .. })));
    assert!(matches!(
        results[1],
        Err(PipelineError::IncompleteTaskInput {
            task: TaskKind::Optimize,
            ..
        })
    ));
    assert!(matches!(results[2], Err(PipelineError::MalformedDocument { .. })));
    assert_eq!(client.call_count(), 0);
}

#[test]
fn oversized_document_is_rejected_synchronously_driven() {
    let client = ScriptedClient::replying("{}");
    let config = PipelineConfig::builder()
        .max_document_bytes(16)
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, client.clone());
    let doc = SourceDocument::new("big.pdf", vec![b'%'; 17]);

    let err = tokio_test::block_on(pipeline.summarize(&doc)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::DocumentTooLarge { size: 17, limit: 16 }
    ));
    assert_eq!(client.call_count(), 0);
}

// ── Full flows (need pdfium) ─────────────────────────────────────────────────

#[tokio::test]
async fn summarize_repairs_fenced_json() {
    skip_unless_pdfium!();
    let client = ScriptedClient::replying(
        "```json\n{\"skills\":[\"Go\"],\"projects\":[],\"certifications\":[],\"objective\":\"x\"}\n```",
    );
    let pipeline = pipeline_with(client.clone(), 1);
    let doc = resume_pdf("jane.pdf", RESUME_TEXT).await;

    let result = pipeline.summarize(&doc).await.unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "status": "ok",
            "data": {"skills": ["Go"], "projects": [], "certifications": [], "objective": "x"}
        })
    );

    let (prompt, temperature) = client.last_call();
    assert_eq!(temperature, TaskKind::Summarize.default_temperature());
    assert!(prompt.contains("Built 3 microservices using distributed queues."));
    for field in ["objective", "skills", "projects", "certifications"] {
        assert!(prompt.contains(field), "prompt lacks field {field}");
    }
}

#[tokio::test]
async fn compare_prose_answer_becomes_fallback() {
    skip_unless_pdfium!();
    let client = ScriptedClient::replying("Not JSON at all");
    let pipeline = pipeline_with(client.clone(), 1);
    let doc = resume_pdf("jane.pdf", RESUME_TEXT).await;

    let result = pipeline
        .compare(&doc, "Staff engineer, Rust and Kubernetes")
        .await
        .unwrap();
    match result {
        StructuredResult::Fallback { reason, raw } => {
            assert!(!reason.is_empty());
            assert_eq!(raw, "Not JSON at all");
        }
        other => panic!("expected fallback, got {other:?}"),
    }

    let (prompt, _) = client.last_call();
    assert!(prompt.contains("Staff engineer, Rust and Kubernetes"));
    for field in ["existing_skills", "missing_skills", "roadmap"] {
        assert!(prompt.contains(field), "prompt lacks field {field}");
    }
}

#[tokio::test]
async fn collaborator_failure_is_surfaced_once() {
    skip_unless_pdfium!();
    let client = ScriptedClient::new(|_| {
        Err(PipelineError::CollaboratorFailure {
            message: "503 Service Unavailable".into(),
        })
    });
    let pipeline = pipeline_with(client.clone(), 1);
    let doc = resume_pdf("jane.pdf", RESUME_TEXT).await;

    let err = pipeline.summarize(&doc).await.unwrap_err();
    assert!(err.is_collaborator_failure());
    assert_eq!(client.call_count(), 1, "no internal retry");
}

#[tokio::test]
async fn optimize_renders_headings_and_body() {
    skip_unless_pdfium!();
    let rewrite = "Summary:\nGo engineer focused on streaming data.\n\nsKiLLs\nGo, Kafka\n\nExperience:\nBuilt 3 microservices using distributed queues.";
    let client = ScriptedClient::replying(rewrite);
    let log = Arc::new(EventLog::default());
    let config = PipelineConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config, client.clone());
    let doc = resume_pdf("jane.pdf", RESUME_TEXT).await;

    let outcome = pipeline
        .run(&TaskRequest::optimize(doc, "Senior Go developer"))
        .await
        .unwrap();
    assert_eq!(outcome.task, TaskKind::Optimize);
    assert!(outcome.stats.source_pages >= 1);
    assert_eq!(outcome.stats.response_chars, rewrite.chars().count());

    let rendered = outcome.result.as_document().unwrap();
    assert_eq!(
        rendered.headings().collect::<Vec<_>>(),
        vec!["Summary:", "sKiLLs", "Experience:"]
    );
    assert_eq!(client.last_call().1, TaskKind::Optimize.default_temperature());

    let text = resume_pipeline::extract_text(rendered.bytes.clone()).await.unwrap();
    let body = text.find("Built 3 microservices").unwrap();
    let heading = text.find("Experience:").unwrap();
    assert!(heading < body, "source order must be preserved");

    assert_eq!(
        *log.events.lock().unwrap(),
        [
            "start:extract",
            "done:extract",
            "start:prompt",
            "done:prompt",
            "start:complete",
            "done:complete",
            "start:render",
            "done:render",
        ]
        .map(String::from)
        .to_vec()
    );
}

#[tokio::test]
async fn multi_page_extraction_keeps_page_order() {
    skip_unless_pdfium!();
    let source = (0..180)
        .map(|i| format!("Line number {i:03}"))
        .collect::<Vec<_>>()
        .join("\n");
    let doc = resume_pdf("long.pdf", &source).await;
    let pipeline = pipeline_with(ScriptedClient::replying("{}"), 1);

    let extracted = pipeline.extract(&doc).await.unwrap();
    assert!(extracted.page_count() > 1);
    assert!(extracted.pages.iter().all(|p| !p.trim().is_empty()));

    let text = extracted.concatenated();
    let positions: Vec<usize> = [0, 60, 120, 179]
        .iter()
        .map(|i| text.find(&format!("Line number {i:03}")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn concurrent_runs_do_not_cross_contaminate() {
    skip_unless_pdfium!();
    // The answer names the candidate found in the prompt.
    let client = ScriptedClient::with_delay(Duration::from_millis(20), |prompt| {
        let id = prompt
            .split("CANDIDATE")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("?");
        Ok(format!("Summary:\nRewritten for CANDIDATE{id}"))
    });
    let pipeline = pipeline_with(client.clone(), 3);

    let mut requests = Vec::new();
    for i in 0..6 {
        let doc = resume_pdf(&format!("c{i}.pdf"), &format!("CANDIDATE{i}\nSkills\nRust")).await;
        requests.push(TaskRequest::optimize(doc, "Platform engineer"));
    }

    let results = pipeline.run_many(&requests).await;
    assert!(client.max_in_flight.load(Ordering::SeqCst) <= 3);

    let dir = tempfile::tempdir().unwrap();
    let mut writes = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        let doc = result.unwrap().result.as_document().unwrap().clone();
        let path = dir.path().join(format!("out-{i}.pdf"));
        writes.push(tokio::spawn(async move {
            persist_document(&doc, &path).await.map(|_| path)
        }));
    }

    for (i, w) in writes.into_iter().enumerate() {
        let path = w.await.unwrap().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let text = resume_pipeline::extract_text(bytes).await.unwrap();
        assert!(
            text.contains(&format!("Rewritten for CANDIDATE{i}")),
            "output {i} has wrong content: {text:?}"
        );
    }
}
