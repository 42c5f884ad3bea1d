//! Result types returned by the pipeline.

use crate::pipeline::layout::{Segment, SegmentKind};
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of normalising a model answer for a structured task.
///
/// Exactly one of two shapes, distinguishable by the `status` tag:
///
/// ```json
/// {"status": "ok", "data": {"skills": ["Go"]}}
/// {"status": "fallback", "reason": "invalid_json: expected value at line 1 column 1", "raw": "Not JSON at all"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StructuredResult {
    /// The answer parsed as a JSON object; returned verbatim.
    Ok { data: Map<String, Value> },
    /// The answer could not be parsed. `raw` is the untouched model output.
    Fallback { reason: String, raw: String },
}

impl StructuredResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, StructuredResult::Ok { .. })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, StructuredResult::Fallback { .. })
    }

    /// The parsed object, if any.
    pub fn data(&self) -> Option<&Map<String, Value>> {
        match self {
            StructuredResult::Ok { data } => Some(data),
            StructuredResult::Fallback { .. } => None,
        }
    }

    /// Look up a top-level field of a parsed answer.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data().and_then(|d| d.get(name))
    }
}

/// A freshly typeset PDF produced from the model's rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// The PDF file contents.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Number of pages in the PDF.
    pub page_count: usize,
    /// Source lines as classified by the heading heuristic, in source order.
    pub segments: Vec<Segment>,
}

impl RenderedDocument {
    /// Heading texts in document order.
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Heading)
            .map(|s| s.text.as_str())
    }
}

/// What a task produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskResult {
    /// Summarize / Compare.
    Structured(StructuredResult),
    /// Optimize.
    Document(RenderedDocument),
}

impl TaskResult {
    pub fn as_structured(&self) -> Option<&StructuredResult> {
        match self {
            TaskResult::Structured(s) => Some(s),
            TaskResult::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&RenderedDocument> {
        match self {
            TaskResult::Document(d) => Some(d),
            TaskResult::Structured(_) => None,
        }
    }
}

/// Timings and sizes for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source document.
    pub source_pages: usize,
    /// Characters of extracted text.
    pub extracted_chars: usize,
    /// Characters in the prompt sent to the model.
    pub prompt_chars: usize,
    /// Characters in the model's raw answer.
    pub response_chars: usize,
    pub extract_duration_ms: u64,
    pub completion_duration_ms: u64,
    /// Normalisation or rendering, depending on the task.
    pub postprocess_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Complete result of [`crate::runner::Pipeline::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: TaskKind,
    pub result: TaskResult,
    pub stats: RunStats,
}
