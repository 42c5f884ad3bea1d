//! Binding to the native pdfium library.
//!
//! Every call resolves the library again through `pdfium-auto`: first
//! `PDFIUM_LIB_PATH`, then its on-disk cache, then a download that happens
//! only while the cache is empty. It then binds a fresh [`Pdfium`] handle.
//! Callers hold the handle only for the duration of one blocking task, so no
//! pdfium state is shared between requests.

use crate::error::PipelineError;
use pdfium_render::prelude::Pdfium;
use tracing::debug;

/// Bind a pdfium handle, downloading the library on first use if needed.
pub fn bind() -> Result<Pdfium, PipelineError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| PipelineError::EngineUnavailable(e.to_string()))?;
    debug!("pdfium bound");
    Ok(pdfium)
}

/// Whether pdfium can be bound without touching the network.
pub fn is_available_offline() -> bool {
    pdfium_auto::is_pdfium_cached()
}
