//! PDF emission: model rewrite → new PDF bytes.
//!
//! [`render_document`] classifies and lays out the text with
//! [`super::layout`], then draws the result with pdfium on the blocking pool.
//! Headings use Helvetica Bold at the heading size; body lines use Helvetica
//! at the body size. Nothing touches the file system: the bytes are returned
//! in a [`RenderedDocument`] and [`persist_document`] writes them when the
//! caller wants a file.
//!
//! ## Concurrent writes
//!
//! [`persist_document`] writes into a uniquely named temporary file in the
//! destination directory and renames it into place. Two renders targeting
//! different paths never share a file; two targeting the same path leave
//! one complete document behind, never a mix of both.

use crate::error::PipelineError;
use crate::output::RenderedDocument;
use crate::pipeline::engine;
use crate::pipeline::layout::{self, PageLayout, RenderStyle, SegmentKind};
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Draws laid-out pages into PDF bytes. Runs on the blocking pool.
pub(crate) type Emitter = fn(&[PageLayout]) -> Result<Vec<u8>, PipelineError>;

/// Typeset `raw` into a fresh PDF.
///
/// Empty input yields a single blank page.
pub async fn render_document(raw: &str, style: &RenderStyle) -> Result<RenderedDocument, PipelineError> {
    render_with(raw, style, emit_blocking).await
}

/// [`render_document`] with the drawing step supplied by the caller.
pub(crate) async fn render_with(
    raw: &str,
    style: &RenderStyle,
    emit: Emitter,
) -> Result<RenderedDocument, PipelineError> {
    style.validate().map_err(PipelineError::InvalidConfig)?;

    let segments = layout::segment(raw);
    let pages = layout::layout(&segments, style);
    debug!(
        "Laid out {} segments on {} page(s)",
        segments.len(),
        pages.len()
    );

    let page_count = pages.len();
    let bytes = tokio::task::spawn_blocking(move || emit(&pages))
        .await
        .map_err(|e| PipelineError::Internal(format!("Render task panicked: {}", e)))??;

    info!("Rendered {} page(s), {} bytes", page_count, bytes.len());
    Ok(RenderedDocument {
        bytes,
        page_count,
        segments,
    })
}

/// Draw laid-out pages with pdfium and serialise the document.
pub fn emit_blocking(pages: &[PageLayout]) -> Result<Vec<u8>, PipelineError> {
    let pdfium = engine::bind()?;
    let mut document = pdfium.create_new_pdf().map_err(render_failed)?;

    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    for (index, page_layout) in pages.iter().enumerate() {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(render_failed)?;

        for line in &page_layout.lines {
            let font = match line.kind {
                SegmentKind::Heading => bold,
                _ => regular,
            };
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(line.y),
                    &line.text,
                    font,
                    PdfPoints::new(line.font_size),
                )
                .map_err(render_failed)?;
        }
        debug!("Page {}: {} lines", index + 1, page_layout.lines.len());
    }

    document.save_to_bytes().map_err(render_failed)
}

fn render_failed(e: PdfiumError) -> PipelineError {
    PipelineError::RenderFailed {
        detail: format!("{:?}", e),
    }
}

/// Write a rendered document to `path` atomically, creating parent directories.
pub async fn persist_document(doc: &RenderedDocument, path: impl AsRef<Path>) -> Result<(), PipelineError> {
    let path = path.as_ref().to_path_buf();
    let bytes = doc.bytes.clone();
    tokio::task::spawn_blocking(move || persist_blocking(&bytes, &path))
        .await
        .map_err(|e| PipelineError::Internal(format!("Write task panicked: {}", e)))?
}

fn persist_blocking(bytes: &[u8], path: &Path) -> Result<(), PipelineError> {
    let write_failed = |source: std::io::Error| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
