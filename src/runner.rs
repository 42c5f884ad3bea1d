//! The orchestrator: document in, task result out.
//!
//! A [`Pipeline`] owns a validated [`PipelineConfig`] and one
//! [`CompletionClient`]. Each call runs
//!
//! ```text
//! check inputs ─▶ extract ─▶ build prompt ─▶ complete ─┬─▶ normalize  (Summarize, Compare)
//!                                                       └─▶ render     (Optimize)
//! ```
//!
//! Missing task inputs are rejected before the document is even parsed, and
//! always before the completion service is contacted. Runs share nothing
//! mutable, so one `Pipeline` can serve any number of concurrent requests.

use crate::config::{PipelineConfig, DEFAULT_MODEL};
use crate::error::PipelineError;
use crate::output::{RenderedDocument, RunStats, StructuredResult, TaskOutcome, TaskResult};
use crate::pipeline::extract::{self, ExtractedText};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::llm::{CompletionClient, LlmCompletionClient};
use crate::pipeline::normalize;
use crate::pipeline::render::{self, Emitter};
use crate::progress::Stage;
use crate::prompts::build_prompt;
use crate::task::{check_target, TaskKind, TaskSpec};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One unit of work for [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub document: SourceDocument,
    /// Job description or target role. Required for Compare and Optimize.
    pub target: Option<String>,
}

impl TaskRequest {
    pub fn summarize(document: SourceDocument) -> Self {
        Self {
            kind: TaskKind::Summarize,
            document,
            target: None,
        }
    }

    pub fn compare(document: SourceDocument, target: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Compare,
            document,
            target: Some(target.into()),
        }
    }

    pub fn optimize(document: SourceDocument, target: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Optimize,
            document,
            target: Some(target.into()),
        }
    }
}

/// Sequences extraction, prompting, completion and post-processing.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    client: Arc<dyn CompletionClient>,
    emit: Emitter,
}

impl Pipeline {
    /// Use an explicit completion client. Nothing is read from the environment.
    pub fn new(config: PipelineConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            config,
            client,
            emit: render::emit_blocking,
        }
    }

    /// Swap the PDF drawing step, leaving layout and everything else intact.
    #[cfg(test)]
    pub(crate) fn with_emitter(mut self, emit: Emitter) -> Self {
        self.emit = emit;
        self
    }

    /// Resolve the LLM provider from the config (and, failing that, the
    /// environment) and wrap it in an [`LlmCompletionClient`].
    pub async fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let provider = resolve_provider(&config).await?;
        let client = LlmCompletionClient::new(
            provider,
            config.max_tokens,
            Duration::from_secs(config.api_timeout_secs),
        );
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read a local path or download a URL, honouring the configured limits.
    pub async fn load(&self, input: &str) -> Result<SourceDocument, PipelineError> {
        input::resolve_input(
            input,
            self.config.download_timeout_secs,
            self.config.max_document_bytes,
        )
        .await
    }

    /// Page texts of `document`. No model call.
    pub async fn extract(&self, document: &SourceDocument) -> Result<ExtractedText, PipelineError> {
        self.check_size(document)?;
        self.stage(Stage::Extract, extract::extract(document.bytes.clone()))
            .await
            .map(|(text, _)| text)
    }

    pub async fn summarize(&self, document: &SourceDocument) -> Result<StructuredResult, PipelineError> {
        let outcome = self.execute(TaskKind::Summarize, document, None).await?;
        into_structured(outcome)
    }

    pub async fn compare(
        &self,
        document: &SourceDocument,
        target: &str,
    ) -> Result<StructuredResult, PipelineError> {
        let outcome = self.execute(TaskKind::Compare, document, Some(target)).await?;
        into_structured(outcome)
    }

    pub async fn optimize(
        &self,
        document: &SourceDocument,
        target: &str,
    ) -> Result<RenderedDocument, PipelineError> {
        let outcome = self.execute(TaskKind::Optimize, document, Some(target)).await?;
        match outcome.result {
            TaskResult::Document(doc) => Ok(doc),
            TaskResult::Structured(_) => Err(PipelineError::Internal(
                "optimize produced a structured result".into(),
            )),
        }
    }

    /// Run one request and report timings alongside the result.
    pub async fn run(&self, request: &TaskRequest) -> Result<TaskOutcome, PipelineError> {
        self.execute(request.kind, &request.document, request.target.as_deref())
            .await
    }

    /// Run independent requests with at most `config.concurrency` in flight.
    ///
    /// Results come back in input order; one failure does not affect the others.
    pub async fn run_many(&self, requests: &[TaskRequest]) -> Vec<Result<TaskOutcome, PipelineError>> {
        info!(
            "Running {} requests, concurrency {}",
            requests.len(),
            self.config.concurrency
        );
        stream::iter(requests.iter().map(|r| self.run(r)))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    async fn execute(
        &self,
        kind: TaskKind,
        document: &SourceDocument,
        target: Option<&str>,
    ) -> Result<TaskOutcome, PipelineError> {
        let total_start = Instant::now();
        info!("Starting {} for '{}'", kind, document.name);

        // ── Step 1: Validate inputs ──────────────────────────────────────
        check_target(kind, target)?;
        self.check_size(document)?;

        // ── Step 2: Extract text ─────────────────────────────────────────
        let (extracted, ms) = self
            .stage(Stage::Extract, extract::extract(document.bytes.clone()))
            .await?;

        let mut outcome = self.run_extracted(kind, &extracted, target).await?;
        outcome.stats.extract_duration_ms = ms;
        outcome.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Finished {} for '{}' in {}ms",
            kind, document.name, outcome.stats.total_duration_ms
        );
        Ok(outcome)
    }

    /// Steps 3 to 5 of a run, starting from text that is already extracted.
    pub(crate) async fn run_extracted(
        &self,
        kind: TaskKind,
        extracted: &ExtractedText,
        target: Option<&str>,
    ) -> Result<TaskOutcome, PipelineError> {
        let start = Instant::now();
        check_target(kind, target)?;

        let text = extracted.concatenated();
        let mut stats = RunStats {
            source_pages: extracted.page_count(),
            extracted_chars: text.chars().count(),
            ..RunStats::default()
        };
        debug!("Extracted {} chars from {} pages", stats.extracted_chars, stats.source_pages);

        // ── Step 3: Build prompt ─────────────────────────────────────────
        let (prompt, _) = self
            .stage(Stage::Prompt, async {
                let spec = TaskSpec::new(kind, text, target.map(str::to_string))?;
                Ok(build_prompt(spec.kind(), spec.text(), spec.target()))
            })
            .await?;
        stats.prompt_chars = prompt.chars().count();

        // ── Step 4: Complete ─────────────────────────────────────────────
        let temperature = self.config.temperature_for(kind);
        let (raw, ms) = self
            .stage(Stage::Complete, self.client.complete(&prompt, temperature))
            .await?;
        stats.response_chars = raw.chars().count();
        stats.completion_duration_ms = ms;

        // ── Step 5: Normalise or render ──────────────────────────────────
        let (result, ms) = if kind.expects_structured_output() {
            let (structured, ms) = self
                .stage(Stage::Normalize, async { Ok(normalize::normalize(&raw)) })
                .await?;
            (TaskResult::Structured(structured), ms)
        } else {
            let (doc, ms) = self
                .stage(
                    Stage::Render,
                    render::render_with(&raw, &self.config.render_style, self.emit),
                )
                .await?;
            (TaskResult::Document(doc), ms)
        };
        stats.postprocess_duration_ms = ms;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        Ok(TaskOutcome {
            task: kind,
            result,
            stats,
        })
    }

    fn check_size(&self, document: &SourceDocument) -> Result<(), PipelineError> {
        if document.len() > self.config.max_document_bytes {
            return Err(PipelineError::DocumentTooLarge {
                size: document.len(),
                limit: self.config.max_document_bytes,
            });
        }
        Ok(())
    }

    /// Await one stage, timing it and notifying the progress callback.
    async fn stage<T>(
        &self,
        stage: Stage,
        work: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<(T, u64), PipelineError> {
        let cb = self.config.progress_callback.as_deref();
        if let Some(cb) = cb {
            cb.on_stage_start(stage);
        }
        let start = Instant::now();
        let result = work.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                debug!("Stage {} finished in {}ms", stage, elapsed_ms);
                if let Some(cb) = cb {
                    cb.on_stage_complete(stage, elapsed_ms);
                }
            }
            Err(e) => {
                warn!("Stage {} failed: {}", stage, e);
                if let Some(cb) = cb {
                    cb.on_stage_error(stage, e.to_string());
                }
            }
        }
        result.map(|value| (value, elapsed_ms))
    }
}

fn into_structured(outcome: TaskOutcome) -> Result<StructuredResult, PipelineError> {
    match outcome.result {
        TaskResult::Structured(s) => Ok(s),
        TaskResult::Document(_) => Err(PipelineError::Internal(format!(
            "{} produced a document instead of structured data",
            outcome.task
        ))),
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PipelineError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is;
/// 2. `config.provider_name` with `config.model` (or [`DEFAULT_MODEL`]);
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set;
/// 4. OpenAI, when `OPENAI_API_KEY` is set;
/// 5. whatever `ProviderFactory::from_env` detects.
async fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, PipelineError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PipelineError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
