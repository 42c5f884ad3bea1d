//! Error type for the resume-pipeline library.
//!
//! Only conditions that make a request impossible to finish are errors.
//! A model that ignores the "respond in JSON" instruction is *not* one of
//! them: that outcome is represented by
//! [`crate::output::StructuredResult::Fallback`] and returned successfully.
//!
//! Errors fall into three groups:
//!
//! * **Input** — the document could not be read, is too large, is not a PDF,
//!   or a required task input (the target description) is missing. These
//!   fail the request before the completion service is contacted.
//! * **Collaborator** — the completion service is not configured, failed, or
//!   timed out. Surfaced as-is; the core never retries.
//! * **Engine / output** — pdfium could not be bound, rendering failed, or the
//!   rendered file could not be written.

use crate::task::TaskKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume-pipeline library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The uploaded document exceeds `max_document_bytes`.
    #[error("Document is {size} bytes, larger than the {limit}-byte limit")]
    DocumentTooLarge { size: usize, limit: usize },

    /// The bytes cannot be opened as a PDF document.
    #[error("Malformed document: {detail}")]
    MalformedDocument { detail: String },

    /// A required input for the chosen task is missing or blank.
    #[error("Task '{task}' requires a non-empty {field}")]
    IncompleteTaskInput { task: TaskKind, field: &'static str },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion service returned an error or was unreachable.
    #[error("Completion service failed: {message}")]
    CollaboratorFailure { message: String },

    /// The completion call did not return within `api_timeout_secs`.
    #[error("Completion service timed out after {secs}s")]
    CollaboratorTimeout { secs: u64 },

    // ── Engine / output errors ────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    EngineUnavailable(String),

    /// pdfium failed while building the output PDF.
    #[error("Rendering the output document failed: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True when the completion service (not the input or the engine) is at fault.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::ProviderNotConfigured { .. }
                | PipelineError::CollaboratorFailure { .. }
                | PipelineError::CollaboratorTimeout { .. }
        )
    }

    /// True for errors caused by what the caller sent rather than by the system.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PipelineError::FileNotFound { .. }
                | PipelineError::PermissionDenied { .. }
                | PipelineError::InvalidInput { .. }
                | PipelineError::DocumentTooLarge { .. }
                | PipelineError::MalformedDocument { .. }
                | PipelineError::IncompleteTaskInput { .. }
        )
    }
}
