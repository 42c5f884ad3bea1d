//! CLI binary for resume-pipeline.
//!
//! A thin shim over the library crate: one subcommand per pipeline
//! operation, flags mapped onto `PipelineConfig`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use resume_pipeline::task::check_target;
use resume_pipeline::{
    build_prompt, extract, normalize, persist_document, render_document, resolve_input, Pipeline,
    PipelineConfig, PipelineProgressCallback, RenderStyle, SourceDocument, Stage, StructuredResult,
    TaskKind, TaskOutcome, TaskRequest, TaskResult, TaskSpec,
};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Extract => "Reading PDF text…",
        Stage::Prompt => "Building prompt…",
        Stage::Complete => "Waiting for the model…",
        Stage::Normalize => "Parsing the answer…",
        Stage::Render => "Typesetting PDF…",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(stage_message(stage));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: String) {
        // First line only, kept short.
        let first = error.lines().next().unwrap_or_default();
        let msg: String = if first.chars().count() > 80 {
            first.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            first.to_string()
        };
        self.bar
            .println(format!("  {} {:<10} {}", red("✗"), stage, red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain text of a résumé (no API key needed)
  resume-pipeline extract resume.pdf

  # Structured summary: objective, skills, projects, certifications
  resume-pipeline summarize resume.pdf

  # Skill gap and six-month roadmap against a job description
  resume-pipeline compare resume.pdf --target-file job.txt

  # Several résumés against the same role, four at a time
  resume-pipeline compare --concurrency 4 --target "Data engineer" a.pdf b.pdf c.pdf

  # Rewrite for a role and typeset a new PDF
  resume-pipeline optimize resume.pdf --target "Senior Go developer" -o tailored.pdf

  # Inspect the exact prompt without calling the model
  resume-pipeline prompt compare resume.pdf --target "SRE"

  # Normalise a saved model answer; typeset arbitrary text
  resume-pipeline normalize answer.txt
  echo -e "Skills:\nRust, Go" | resume-pipeline render -o out.pdf

OUTPUT:
  summarize / compare print {"status": "ok", "data": {...}} when the model
  answered with a JSON object, otherwise {"status": "fallback", "reason": ...,
  "raw": ...} with the untouched answer. Both exit with status 0.
  --json prints the full outcome, including per-stage timings.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Run:             resume-pipeline summarize resume.pdf

  PDFium (~30 MB) is downloaded automatically on first run and cached.
  To use an existing copy: PDFIUM_LIB_PATH=/path/to/libpdfium resume-pipeline ...
"#;

/// Summarise, gap-analyse and rewrite résumé PDFs with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "resume-pipeline",
    version,
    about = "Summarise, gap-analyse and rewrite résumé PDFs with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0). Default: per task.
    #[arg(long, global = true, env = "RESUME_PIPELINE_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max tokens in the model's answer.
    #[arg(long, global = true, env = "RESUME_PIPELINE_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Documents processed at once when several inputs are given.
    #[arg(short, long, global = true, env = "RESUME_PIPELINE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Largest accepted document, in bytes.
    #[arg(long, global = true, env = "RESUME_PIPELINE_MAX_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_bytes: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "RESUME_PIPELINE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Model call timeout in seconds.
    #[arg(long, global = true, env = "RESUME_PIPELINE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Print machine-readable JSON.
    #[arg(long, global = true, env = "RESUME_PIPELINE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "RESUME_PIPELINE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RESUME_PIPELINE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RESUME_PIPELINE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text layer of a PDF, pages concatenated in order.
    Extract {
        /// Local PDF path or HTTP/HTTPS URL.
        input: String,
    },
    /// Print the prompt a task would send, without calling the model.
    Prompt {
        /// summarize, compare or optimize.
        task: TaskKind,
        input: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Extract objective, skills, projects and certifications as JSON.
    Summarize {
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Compare against a job description: existing / missing skills and a six-month roadmap.
    Compare {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Rewrite for a target role and typeset the result as a new PDF.
    Optimize {
        input: String,
        #[command(flatten)]
        target: TargetArgs,
        /// Output PDF. Default: <input stem>-optimized.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Normalise a raw model answer (file or stdin) into the ok/fallback JSON shape.
    Normalize {
        /// Read from this file instead of stdin.
        file: Option<PathBuf>,
    },
    /// Typeset plain text (file or stdin) with the heading/body layout.
    Render {
        /// Read from this file instead of stdin.
        file: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Job description or target role, inline.
    #[arg(long, visible_alias = "jd", env = "RESUME_PIPELINE_TARGET", conflicts_with = "target_file")]
    target: Option<String>,

    /// Read the job description from a file.
    #[arg(long)]
    target_file: Option<PathBuf>,
}

impl TargetArgs {
    async fn resolve(&self) -> Result<Option<String>> {
        match (&self.target, &self.target_file) {
            (Some(t), _) => Ok(Some(t.clone())),
            (None, Some(path)) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read target description from {:?}", path))?;
                Ok(Some(text))
            }
            (None, None) => Ok(None),
        }
    }

    /// Resolve the target and reject a missing one for tasks that need it.
    async fn resolve_for(&self, kind: TaskKind) -> Result<Option<String>> {
        let target = self.resolve().await?;
        check_target(kind, target.as_deref())?;
        Ok(target)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level progress; keep library logs to errors
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && cli.command.calls_model();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Missing targets are reported before any download or provider lookup.
    let target = match &cli.command {
        Command::Prompt { task, target, .. } => target.resolve_for(*task).await?,
        Command::Compare { target, .. } => target.resolve_for(TaskKind::Compare).await?,
        Command::Optimize { target, .. } => target.resolve_for(TaskKind::Optimize).await?,
        _ => None,
    };

    if cli.command.needs_engine() {
        ensure_engine(cli.quiet)?;
    }

    match &cli.command {
        Command::Extract { input } => cmd_extract(&cli, input).await,
        Command::Prompt { task, input, .. } => cmd_prompt(&cli, *task, input, target).await,
        Command::Summarize { inputs } => {
            cmd_structured(&cli, TaskKind::Summarize, inputs, None, show_progress).await
        }
        Command::Compare { inputs, .. } => {
            cmd_structured(&cli, TaskKind::Compare, inputs, target, show_progress).await
        }
        Command::Optimize { input, output, .. } => {
            cmd_optimize(&cli, input, target, output.as_deref(), show_progress).await
        }
        Command::Normalize { file } => cmd_normalize(file.as_deref()),
        Command::Render { file, output } => cmd_render(&cli, file.as_deref(), output).await,
    }
}

impl Command {
    fn calls_model(&self) -> bool {
        matches!(
            self,
            Command::Summarize { .. } | Command::Compare { .. } | Command::Optimize { .. }
        )
    }

    fn needs_engine(&self) -> bool {
        !matches!(self, Command::Normalize { .. })
    }
}

/// Make sure pdfium is on disk before any stage needs it, showing the
/// one-time download.
fn ensure_engine(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map global flags to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .max_tokens(cli.max_tokens)
        .concurrency(cli.concurrency)
        .max_document_bytes(cli.max_bytes)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn load(cli: &Cli, input: &str) -> Result<SourceDocument> {
    resolve_input(input, cli.download_timeout, cli.max_bytes)
        .await
        .with_context(|| format!("Failed to load '{}'", input))
}

// ── Subcommands ──────────────────────────────────────────────────────────

async fn cmd_extract(cli: &Cli, input: &str) -> Result<()> {
    let doc = load(cli, input).await?;
    let text = extract(doc.bytes).await.context("Extraction failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&text).context("Failed to serialise output")?);
    } else {
        write_stdout(&text.concatenated())?;
    }
    if !cli.quiet && text.is_blank() {
        eprintln!(
            "{} no text layer found (scanned document?)",
            yellow("⚠")
        );
    }
    Ok(())
}

async fn cmd_prompt(cli: &Cli, task: TaskKind, input: &str, target: Option<String>) -> Result<()> {
    let doc = load(cli, input).await?;
    let text = extract(doc.bytes).await.context("Extraction failed")?;
    let spec = TaskSpec::new(task, text.concatenated(), target)?;
    write_stdout(&build_prompt(spec.kind(), spec.text(), spec.target()))
}

async fn cmd_structured(
    cli: &Cli,
    kind: TaskKind,
    inputs: &[String],
    target: Option<String>,
    show_progress: bool,
) -> Result<()> {
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(cli, progress.clone())?;
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialise the LLM provider")?;

    let mut requests = Vec::with_capacity(inputs.len());
    for input in inputs {
        requests.push(TaskRequest {
            kind,
            document: load(cli, input).await?,
            target: target.clone(),
        });
    }

    let results = pipeline.run_many(&requests).await;
    if let Some(ref p) = progress {
        p.finish();
    }

    let mut failures = 0usize;
    let mut printed = Vec::with_capacity(results.len());
    for (input, result) in inputs.iter().zip(results) {
        match result {
            Ok(outcome) => {
                if !cli.quiet {
                    report_outcome(input, &outcome);
                }
                printed.push(outcome);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", red("✘"), input, e);
            }
        }
    }

    let json = if cli.json {
        if inputs.len() == 1 {
            printed.first().map(serde_json::to_string_pretty)
        } else {
            Some(serde_json::to_string_pretty(&printed))
        }
    } else {
        let structured: Vec<&StructuredResult> = printed
            .iter()
            .filter_map(|o| o.result.as_structured())
            .collect();
        if inputs.len() == 1 {
            structured.first().map(serde_json::to_string_pretty)
        } else {
            Some(serde_json::to_string_pretty(&structured))
        }
    };
    if let Some(json) = json {
        println!("{}", json.context("Failed to serialise output")?);
    }

    if failures > 0 {
        bail!("{} of {} documents failed", failures, inputs.len());
    }
    Ok(())
}

fn report_outcome(input: &str, outcome: &TaskOutcome) {
    let verdict = match &outcome.result {
        TaskResult::Structured(StructuredResult::Ok { .. }) => green("✔ parsed"),
        TaskResult::Structured(StructuredResult::Fallback { reason, .. }) => {
            yellow(&format!("⚠ fallback ({})", reason.split(':').next().unwrap_or(reason)))
        }
        TaskResult::Document(doc) => green(&format!("✔ {} page(s)", doc.page_count)),
    };
    eprintln!(
        "{} {}  {}",
        verdict,
        bold(input),
        dim(&format!(
            "{} pages in  ·  {} chars out  ·  {}ms",
            outcome.stats.source_pages, outcome.stats.response_chars, outcome.stats.total_duration_ms
        )),
    );
}

async fn cmd_optimize(
    cli: &Cli,
    input: &str,
    target: Option<String>,
    output: Option<&Path>,
    show_progress: bool,
) -> Result<()> {
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(cli, progress.clone())?;
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialise the LLM provider")?;

    let document = load(cli, input).await?;
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}-optimized.pdf", document.stem())));

    let request = TaskRequest {
        kind: TaskKind::Optimize,
        document,
        target,
    };
    let result = pipeline.run(&request).await;
    if let Some(ref p) = progress {
        p.finish();
    }
    let outcome = result.context("Optimization failed")?;

    let doc = outcome
        .result
        .as_document()
        .context("optimize did not produce a document")?;
    persist_document(doc, &output_path)
        .await
        .context("Failed to write the optimized résumé")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise output")?
        );
    }
    if !cli.quiet {
        report_outcome(input, &outcome);
        eprintln!("   →  {}", bold(&output_path.display().to_string()));
    }
    Ok(())
}

fn cmd_normalize(file: Option<&Path>) -> Result<()> {
    let raw = read_text(file)?;
    let result = normalize(&raw);
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialise output")?
    );
    Ok(())
}

async fn cmd_render(cli: &Cli, file: Option<&Path>, output: &Path) -> Result<()> {
    let raw = read_text(file)?;
    let doc = render_document(&raw, &RenderStyle::default())
        .await
        .context("Rendering failed")?;
    persist_document(&doc, output)
        .await
        .context("Failed to write PDF")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&doc).context("Failed to serialise output")?);
    } else if !cli.quiet {
        eprintln!(
            "{} {} page(s), {} heading(s)  →  {}",
            green("✔"),
            doc.page_count,
            doc.headings().count(),
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

// ── I/O helpers ──────────────────────────────────────────────────────────

/// Read a file, or stdin when no file (or `-`) is given.
fn read_text(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path)),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    // Ensure a trailing newline on stdout.
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_pipeline::PipelineError;

    fn no_target() -> TargetArgs {
        TargetArgs {
            target: None,
            target_file: None,
        }
    }

    #[tokio::test]
    async fn missing_target_is_rejected_before_any_work() {
        for kind in [TaskKind::Compare, TaskKind::Optimize] {
            let err = no_target().resolve_for(kind).await.unwrap_err();
            let err = err.downcast::<PipelineError>().unwrap();
            assert!(matches!(err, PipelineError::IncompleteTaskInput { .. }), "{err}");
        }
        assert_eq!(no_target().resolve_for(TaskKind::Summarize).await.unwrap(), None);
    }

    #[tokio::test]
    async fn target_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.txt");
        std::fs::write(&path, "Staff SRE, Kubernetes").unwrap();
        let args = TargetArgs {
            target: None,
            target_file: Some(path),
        };
        let target = args.resolve_for(TaskKind::Compare).await.unwrap();
        assert_eq!(target.as_deref(), Some("Staff SRE, Kubernetes"));
    }
}
