//! The document-parsing capability consumed by the extraction pipeline.
//!
//! The pipeline only needs four things from a PDF library: open a document
//! from bytes, report its page count, address a page by number, and hand back
//! that page's text content as an ordered list of fragments. These traits are
//! that contract. [`crate::pipeline::pdfium::PdfiumParser`] is the production
//! implementation; tests substitute in-memory fakes.

use crate::error::DocumentError;
use async_trait::async_trait;

/// Separator placed between the text fragments of one page.
pub const FRAGMENT_SEPARATOR: &str = " ";

/// Appended after every page's text in the extracted buffer.
pub const PAGE_BREAK: &str = "\n\n";

/// Opens raw bytes as a paginated document.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn ParsedDocument>, DocumentError>;
}

/// An opened document.
#[async_trait]
pub trait ParsedDocument: Send + Sync {
    /// Number of pages reported by the parser.
    fn page_count(&self) -> usize;

    /// Text content of a page (1-indexed), in reading order as the parser
    /// reports it.
    async fn page_text(&self, page_num: usize) -> Result<PageText, DocumentError>;
}

/// The text content of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Text fragments in the order the parser produced them.
    pub items: Vec<String>,
}

impl PageText {
    pub fn new(page_num: usize, items: Vec<String>) -> Self {
        Self { page_num, items }
    }

    /// Fragments joined with [`FRAGMENT_SEPARATOR`].
    pub fn joined(&self) -> String {
        self.items.join(FRAGMENT_SEPARATOR)
    }
}
