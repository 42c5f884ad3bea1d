//! # resume-pipeline
//!
//! Turn a résumé PDF into structured insight or a rewritten PDF using an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     read a local file or download from URL (in memory)
//!  ├─ 2. Extract   page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Prompt    task instructions + delimited résumé / target text
//!  ├─ 4. Complete  one call to gpt-4.1-nano / claude / gemini / …
//!  └─ 5. Output    Summarize, Compare → tolerant JSON normalisation
//!                  Optimize           → heading/body layout → new PDF
//! ```
//!
//! The model's answer is never trusted. Structured tasks always return a
//! [`StructuredResult`]: either the parsed JSON object or a fallback that
//! carries the raw text and the reason it could not be parsed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume_pipeline::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let pipeline = Pipeline::from_config(PipelineConfig::default()).await?;
//!     let resume = pipeline.load("resume.pdf").await?;
//!
//!     let summary = pipeline.summarize(&resume).await?;
//!     println!("{}", serde_json::to_string_pretty(&summary)?);
//!
//!     let rewritten = pipeline.optimize(&resume, "Senior backend engineer, Go and Kafka").await?;
//!     resume_pipeline::persist_document(&rewritten, "resume-optimized.pdf").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume-pipeline` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume-pipeline = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod runner;
pub mod task;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_MODEL};
pub use error::PipelineError;
pub use output::{RenderedDocument, RunStats, StructuredResult, TaskOutcome, TaskResult};
pub use pipeline::extract::{extract, extract_text, ExtractedText};
pub use pipeline::input::{resolve_input, SourceDocument};
pub use pipeline::layout::{RenderStyle, Segment, SegmentKind};
pub use pipeline::llm::{CompletionClient, LlmCompletionClient};
pub use pipeline::normalize::{normalize, FallbackReason};
pub use pipeline::render::{persist_document, render_document};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use prompts::build_prompt;
pub use runner::{Pipeline, TaskRequest};
pub use task::{TaskKind, TaskSpec};
