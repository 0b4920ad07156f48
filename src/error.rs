//! Error types for the edgequake-pdf2study library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`StudyError`]: returned as `Err` from session operations. Covers the
//!   user preconditions (no document selected, empty text) that block an
//!   operation before any work begins, plus configuration problems.
//!
//! * [`DocumentError`]: anything that goes wrong while loading, opening or
//!   reading a document. The session never shows these verbatim: it logs them
//!   and publishes [`EXTRACTION_FAILED_MESSAGE`] instead.
//!
//! * [`RequestError`]: a failed exchange with the generation service.
//!   [`RequestError::user_message`] picks the text that ends up in the
//!   session's error field.

use std::path::PathBuf;
use thiserror::Error;

/// Message published when the extraction pipeline fails for any reason.
pub const EXTRACTION_FAILED_MESSAGE: &str = "An error occurred while extracting text from the PDF.";

/// Fallback when the service rejects a request without a usable `detail`.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";

/// Fallback when a transport failure carries no message of its own.
pub const REQUEST_ERROR_MESSAGE: &str = "An error occurred during the request.";

/// Errors returned directly to the caller of a session operation.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Preconditions ─────────────────────────────────────────────────────
    /// Extraction was requested before any document was selected.
    #[error("Please select a PDF file first.")]
    NoDocumentSelected,

    /// Generation was requested with an empty or whitespace-only buffer.
    #[error("Extract text from a PDF or enter some text before generating.")]
    EmptyText,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    /// True for the errors that mean "the user has to do something first".
    pub fn is_precondition(&self) -> bool {
        matches!(self, StudyError::NoDocumentSelected | StudyError::EmptyText)
    }
}

/// Failures of the extraction pipeline.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the file.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// Requested page number is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The parser could not produce the text content of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    PageTextFailed { page: usize, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// A blocking parser task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the generation request.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The service answered with a non-2xx status.
    #[error("Generation service returned HTTP {status}: {}", .detail.as_deref().unwrap_or(REQUEST_FAILED_MESSAGE))]
    Service { status: u16, detail: Option<String> },

    /// The request never got a response (connection refused, DNS, timeout…).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body could not be decoded.
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    /// The text to publish in the session's error field.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::Service { detail, .. } => detail
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(REQUEST_FAILED_MESSAGE)
                .to_string(),
            RequestError::Transport(msg) | RequestError::InvalidResponse(msg) => {
                if msg.is_empty() {
                    REQUEST_ERROR_MESSAGE.to_string()
                } else {
                    msg.clone()
                }
            }
        }
    }
}
