//! Pipeline stages for résumé processing.
//!
//! Each submodule implements one step; [`crate::runner`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts ──▶ llm ──┬─▶ normalize   (Summarize, Compare)
//! (path/URL) (pdfium)   (text)     (model) └─▶ layout ─▶ render   (Optimize)
//! ```
//!
//! 1. [`input`]     — load the uploaded document into memory, enforcing the size limit
//! 2. [`extract`]   — page texts via pdfium, in page order; runs in `spawn_blocking`
//! 3. [`llm`]       — one completion call behind the [`llm::CompletionClient`] seam
//! 4. [`normalize`] — tolerant JSON parsing into ok / fallback
//! 5. [`layout`]    — heading/body classification and pagination (pure)
//! 6. [`render`]    — draw the layout into a new PDF with pdfium
//!
//! [`engine`] owns the pdfium binding shared by `extract` and `render`.

pub mod engine;
pub mod extract;
pub mod input;
pub mod layout;
pub mod llm;
pub mod normalize;
pub mod render;
