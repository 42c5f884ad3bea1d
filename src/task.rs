//! Task kinds and validated task inputs.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which prompt template and output shape a request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Condense the résumé into a fixed set of JSON fields.
    Summarize,
    /// Compare the résumé against a target description (skill gap + roadmap).
    Compare,
    /// Rewrite the résumé for a target description and typeset it as a PDF.
    Optimize,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Summarize, TaskKind::Compare, TaskKind::Optimize];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Summarize => "summarize",
            TaskKind::Compare => "compare",
            TaskKind::Optimize => "optimize",
        }
    }

    /// Whether the task needs a target description besides the document.
    pub fn requires_target(&self) -> bool {
        !matches!(self, TaskKind::Summarize)
    }

    /// Whether the model's answer is normalised into JSON (vs. rendered as a PDF).
    pub fn expects_structured_output(&self) -> bool {
        !matches!(self, TaskKind::Optimize)
    }

    /// Sampling temperature used when the config does not override it.
    ///
    /// Extraction-style tasks stay close to the source; the rewrite gets a
    /// little more room.
    pub fn default_temperature(&self) -> f32 {
        match self {
            TaskKind::Summarize => 0.2,
            TaskKind::Compare => 0.3,
            TaskKind::Optimize => 0.5,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summarize" | "summarise" => Ok(TaskKind::Summarize),
            "compare" | "analyze" | "analyse" => Ok(TaskKind::Compare),
            "optimize" | "optimise" => Ok(TaskKind::Optimize),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown task '{other}' (expected summarize, compare or optimize)"
            ))),
        }
    }
}

/// A task kind together with every input it needs.
///
/// Only constructible through [`TaskSpec::new`], which rejects blank inputs,
/// so holding a `TaskSpec` means the prompt can be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    kind: TaskKind,
    text: String,
    target: Option<String>,
}

impl TaskSpec {
    pub fn new(
        kind: TaskKind,
        text: impl Into<String>,
        target: Option<String>,
    ) -> Result<Self, PipelineError> {
        check_target(kind, target.as_deref())?;
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::IncompleteTaskInput {
                task: kind,
                field: "document text",
            });
        }
        // Summarize ignores a stray target rather than rejecting it.
        let target = if kind.requires_target() { target } else { None };
        Ok(Self { kind, text, target })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

/// Reject a missing or blank target description for tasks that need one.
///
/// Split out so the orchestrator can fail before doing any extraction work.
pub fn check_target(kind: TaskKind, target: Option<&str>) -> Result<(), PipelineError> {
    if kind.requires_target() && target.is_none_or(|t| t.trim().is_empty()) {
        return Err(PipelineError::IncompleteTaskInput {
            task: kind,
            field: "target description",
        });
    }
    Ok(())
}
