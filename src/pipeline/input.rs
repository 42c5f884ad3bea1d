//! Input resolution: a user-supplied path or URL → document bytes in memory.
//!
//! Nothing is written to disk. Local files are read directly; URLs are
//! downloaded with `reqwest`. Both paths enforce `max_bytes` so an
//! oversized upload is rejected with [`PipelineError::DocumentTooLarge`]
//! before it reaches pdfium. Whether the bytes are actually a PDF is
//! decided later, by extraction.

use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An uploaded résumé, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name used in logs and default output names.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Name without directory or extension, e.g. `jane-doe` for `cv/jane-doe.pdf`.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the document named by `input`, a local path or an HTTP(S) URL.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<SourceDocument, PipelineError> {
    if input.trim().is_empty() {
        return Err(PipelineError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs, max_bytes).await
    } else {
        read_local(input, max_bytes).await
    }
}

async fn read_local(path_str: &str, max_bytes: usize) -> Result<SourceDocument, PipelineError> {
    let path = PathBuf::from(path_str);

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| local_error(&path, e))?;
    if !meta.is_file() {
        return Err(PipelineError::InvalidInput {
            input: path_str.to_string(),
        });
    }
    check_size(meta.len() as usize, max_bytes)?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| local_error(&path, e))?;
    // The file may have grown between stat and read.
    check_size(bytes.len(), max_bytes)?;

    debug!("Read local document: {} ({} bytes)", path.display(), bytes.len());
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    Ok(SourceDocument::new(name, bytes))
}

fn local_error(path: &Path, e: std::io::Error) -> PipelineError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        PipelineError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        PipelineError::FileNotFound {
            path: path.to_path_buf(),
        }
    }
}

async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<SourceDocument, PipelineError> {
    info!("Downloading document from: {}", url);

    let download_failed = |reason: String| PipelineError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            PipelineError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }
    if let Some(declared) = response.content_length() {
        check_size(declared as usize, max_bytes)?;
    }

    // Stream the body so a server that lies about its length cannot push us past the limit.
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        check_size(bytes.len() + chunk.len(), max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok(SourceDocument::new(filename_from_url(url), bytes))
}

fn check_size(size: usize, limit: usize) -> Result<(), PipelineError> {
    if size > limit {
        return Err(PipelineError::DocumentTooLarge { size, limit });
    }
    Ok(())
}

/// Last path segment of the URL, if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
