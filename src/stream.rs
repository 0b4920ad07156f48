//! Streaming page-text API.
//!
//! [`page_texts`] turns an opened document into a lazy stream that requests
//! page 1, then page 2, and so on. A page is only requested once the
//! previous one has been consumed, so there is never more than one page in
//! flight. The stream is finite (`page_count` items) and cannot be restarted.
//!
//! The eager [`crate::extract`] functions fold this stream into one buffer;
//! use [`extract_stream`] directly to handle pages progressively.

use crate::config::StudyConfig;
use crate::error::DocumentError;
use crate::pipeline::document::{DocumentParser, PageText, ParsedDocument};
use crate::pipeline::input::DocumentHandle;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page texts in ascending page order.
pub type PageTextStream = Pin<Box<dyn Stream<Item = Result<PageText, DocumentError>> + Send>>;

/// Lazily read every page of `document`, in ascending order.
pub fn page_texts(document: Arc<dyn ParsedDocument>) -> PageTextStream {
    let total = document.page_count();
    let s = stream::iter(1..=total).then(move |page_num| {
        let document = Arc::clone(&document);
        async move { document.page_text(page_num).await }
    });
    Box::pin(s)
}

/// Load and open `handle`, returning its page count and page stream.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2study::{extract_stream, DocumentHandle, PdfiumParser, StudyConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = StudyConfig::default();
/// let parser = PdfiumParser::default();
/// let handle = DocumentHandle::from_path("lecture.pdf");
/// let (total, mut pages) = extract_stream(&handle, &parser, &config).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {}/{}: {}", page.page_num, total, page.joined());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn extract_stream(
    handle: &DocumentHandle,
    parser: &dyn DocumentParser,
    config: &StudyConfig,
) -> Result<(usize, PageTextStream), DocumentError> {
    info!("Starting streaming extraction: {}", handle.name());
    let bytes = handle.load(config.download_timeout_secs).await?;
    let document: Arc<dyn ParsedDocument> = Arc::from(parser.open(bytes).await?);
    let total = document.page_count();
    Ok((total, page_texts(document)))
}
