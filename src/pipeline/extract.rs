//! Text extraction: PDF bytes → page texts, in page order.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks for the whole parse. [`extract`] moves the work onto the
//! blocking pool so Tokio workers keep serving other requests.
//!
//! ## All or nothing
//!
//! A page whose text layer cannot be read fails the whole extraction. The
//! caller either gets every page, in order, or a
//! [`PipelineError::MalformedDocument`]; never a prefix of the document.

use crate::error::PipelineError;
use crate::pipeline::engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Every PDF header starts with this.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Text of a document, one entry per page, in stored page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All page texts joined in page order, with no separator added.
    pub fn concatenated(&self) -> String {
        self.pages.concat()
    }

    /// True when no page carries any non-whitespace text (e.g. a scanned PDF).
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Extract page texts on the blocking pool.
pub async fn extract(bytes: Vec<u8>) -> Result<ExtractedText, PipelineError> {
    tokio::task::spawn_blocking(move || extract_blocking(&bytes))
        .await
        .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Extract and concatenate in one step.
pub async fn extract_text(bytes: Vec<u8>) -> Result<String, PipelineError> {
    Ok(extract(bytes).await?.concatenated())
}

/// Blocking implementation of [`extract`].
///
/// The magic-byte check runs before pdfium is bound, so obviously wrong
/// uploads are rejected even on hosts without the native library.
pub fn extract_blocking(bytes: &[u8]) -> Result<ExtractedText, PipelineError> {
    check_magic(bytes)?;

    let pdfium = engine::bind()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PipelineError::MalformedDocument {
            detail: format!("pdfium could not open the document: {:?}", e),
        })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| PipelineError::MalformedDocument {
                detail: format!("page {} has no readable text layer: {:?}", index + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars", index + 1, text.len());
        texts.push(text);
    }

    Ok(ExtractedText { pages: texts })
}

/// Reject bytes that cannot possibly be a PDF.
fn check_magic(bytes: &[u8]) -> Result<(), PipelineError> {
    if bytes.len() < PDF_MAGIC.len() {
        return Err(PipelineError::MalformedDocument {
            detail: format!("document is only {} bytes long", bytes.len()),
        });
    }
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    if !window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PipelineError::MalformedDocument {
            detail: format!("not a PDF (first bytes: {:?})", magic),
        });
    }
    Ok(())
}
