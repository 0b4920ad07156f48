//! Eager (whole-document) extraction entry points.
//!
//! [`extract_document_text`] is the extraction pipeline proper: an ordered
//! fold over [`crate::stream::page_texts`] that short-circuits on the first
//! failing page and drops whatever it had accumulated. Callers therefore see
//! either the complete buffer or an error, never a prefix of the document.
//!
//! The session uses it for [`crate::session::StudySession::extract`]; the
//! free functions below are for callers that only want the text.

use crate::config::StudyConfig;
use crate::error::DocumentError;
use crate::output::DocumentInfo;
use crate::pipeline::document::{DocumentParser, ParsedDocument, PAGE_BREAK};
use crate::pipeline::input::DocumentHandle;
use crate::pipeline::pdfium::PdfiumParser;
use crate::progress::ProgressCallback;
use crate::stream::page_texts;
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Read every page of an opened document into one buffer.
///
/// Each page contributes its fragments joined by a single space, followed by
/// [`PAGE_BREAK`]. A document with zero pages yields an empty string.
pub async fn extract_document_text(
    document: Arc<dyn ParsedDocument>,
    progress: Option<&ProgressCallback>,
) -> Result<String, DocumentError> {
    let total_pages = document.page_count();
    if let Some(cb) = progress {
        cb.on_extraction_start(total_pages);
    }

    let text = page_texts(document)
        .try_fold(String::new(), |mut buffer, page| async move {
            let joined = page.joined();
            debug!("Page {}/{}: {} chars", page.page_num, total_pages, joined.len());
            if let Some(cb) = progress {
                cb.on_page_extracted(page.page_num, total_pages, joined.len());
            }
            buffer.push_str(&joined);
            buffer.push_str(PAGE_BREAK);
            Ok(buffer)
        })
        .await?;

    if let Some(cb) = progress {
        cb.on_extraction_complete(total_pages, text.len());
    }
    Ok(text)
}

/// Load, open and extract `handle` with an arbitrary parser.
pub async fn extract_with(
    handle: &DocumentHandle,
    parser: &dyn DocumentParser,
    config: &StudyConfig,
) -> Result<String, DocumentError> {
    let start = Instant::now();
    info!("Starting extraction: {}", handle.name());

    let bytes = handle.load(config.download_timeout_secs).await?;
    let document: Arc<dyn ParsedDocument> = Arc::from(parser.open(bytes).await?);
    let pages = document.page_count();
    let text = extract_document_text(document, config.progress_callback.as_ref()).await?;

    info!(
        "Extraction complete: {} pages, {} chars, {}ms",
        pages,
        text.len(),
        start.elapsed().as_millis()
    );
    Ok(text)
}

/// Extract the text of a PDF with pdfium.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2study::{extract_text, DocumentHandle, StudyConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let text = extract_text(&DocumentHandle::from_path("lecture.pdf"), &StudyConfig::default()).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub async fn extract_text(
    handle: &DocumentHandle,
    config: &StudyConfig,
) -> Result<String, DocumentError> {
    let parser = PdfiumParser::new(config.password.clone(), config.pdfium_library.clone());
    extract_with(handle, &parser, config).await
}

/// Synchronous wrapper around [`extract_text`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_text_sync(
    handle: &DocumentHandle,
    config: &StudyConfig,
) -> Result<String, DocumentError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocumentError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_text(handle, config))
}

/// Open a document and report its page count without reading any page text.
pub async fn inspect(
    handle: &DocumentHandle,
    config: &StudyConfig,
) -> Result<DocumentInfo, DocumentError> {
    let parser = PdfiumParser::new(config.password.clone(), config.pdfium_library.clone());
    inspect_with(handle, &parser, config).await
}

/// [`inspect`] with an arbitrary parser.
pub async fn inspect_with(
    handle: &DocumentHandle,
    parser: &dyn DocumentParser,
    config: &StudyConfig,
) -> Result<DocumentInfo, DocumentError> {
    let bytes = handle.load(config.download_timeout_secs).await?;
    let byte_len = bytes.len();
    let document = parser.open(bytes).await?;
    Ok(DocumentInfo {
        name: handle.name(),
        page_count: document.page_count(),
        byte_len,
    })
}
