//! Document handles: what the user selected, and how to get its bytes.
//!
//! A [`DocumentHandle`] is cheap to clone and holds no open resources. Bytes
//! are only loaded when an extraction starts, so a handle selected long ago
//! still reflects the file as it is on disk at extraction time.

use crate::error::DocumentError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A reference to a user-selected document.
#[derive(Clone)]
pub enum DocumentHandle {
    /// A file on the local file system.
    File(PathBuf),
    /// Bytes already in memory (uploads, database blobs…).
    Bytes { name: String, data: Arc<[u8]> },
    /// A PDF reachable over HTTP/HTTPS; downloaded when loaded.
    Url(String),
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentHandle::File(p) => f.debug_tuple("File").field(p).finish(),
            DocumentHandle::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            DocumentHandle::Url(u) => f.debug_tuple("Url").field(u).finish(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

impl DocumentHandle {
    /// Interpret a CLI-style input: URLs become [`DocumentHandle::Url`],
    /// anything else a local path.
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DocumentError::InvalidInput {
                input: input.to_string(),
            });
        }
        if is_url(trimmed) {
            reqwest::Url::parse(trimmed).map_err(|_| DocumentError::InvalidInput {
                input: input.to_string(),
            })?;
            Ok(DocumentHandle::Url(trimmed.to_string()))
        } else {
            Ok(DocumentHandle::File(PathBuf::from(trimmed)))
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        DocumentHandle::File(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        DocumentHandle::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Short name suitable for display (file name or last URL segment).
    pub fn name(&self) -> String {
        match self {
            DocumentHandle::File(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
            DocumentHandle::Bytes { name, .. } => name.clone(),
            DocumentHandle::Url(url) => filename_from_url(url),
        }
    }

    /// Load the document's raw bytes.
    ///
    /// `download_timeout_secs` only applies to [`DocumentHandle::Url`].
    pub async fn load(&self, download_timeout_secs: u64) -> Result<Vec<u8>, DocumentError> {
        match self {
            DocumentHandle::File(path) => read_local(path).await,
            DocumentHandle::Bytes { data, .. } => Ok(data.to_vec()),
            DocumentHandle::Url(url) => download_url(url, download_timeout_secs).await,
        }
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>, DocumentError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) => Err(match e.kind() {
            std::io::ErrorKind::NotFound => DocumentError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => DocumentError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => DocumentError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, DocumentError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocumentError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_download_error = |e: reqwest::Error| {
        if e.is_timeout() {
            DocumentError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocumentError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_download_error)?;

    if !response.status().is_success() {
        return Err(DocumentError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(to_download_error)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
