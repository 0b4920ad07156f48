//! pdfium-backed [`DocumentParser`].
//!
//! ## Threading
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Every pdfium call therefore runs inside `tokio::task::spawn_blocking`.
//!
//! A `PdfDocument` borrows the `Pdfium` instance that loaded it, so it cannot
//! be kept alive across blocking tasks. [`PdfiumDocument`] keeps the raw bytes
//! instead and reopens them for each page request; pdfium parses lazily, so a
//! reopen only touches the xref and the requested page.

use crate::error::DocumentError;
use crate::pipeline::document::{DocumentParser, PageText, ParsedDocument};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Opens documents with pdfium and reads page text as pdfium text segments.
#[derive(Debug, Clone, Default)]
pub struct PdfiumParser {
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumParser {
    pub fn new(password: Option<String>, library_path: Option<PathBuf>) -> Self {
        Self {
            password,
            library_path,
        }
    }
}

#[async_trait]
impl DocumentParser for PdfiumParser {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn ParsedDocument>, DocumentError> {
        check_magic(&bytes)?;

        let bytes = Arc::new(bytes);
        let password = self.password.clone();
        let library_path = self.library_path.clone();

        let page_count = {
            let bytes = Arc::clone(&bytes);
            let password = password.clone();
            let library_path = library_path.clone();
            tokio::task::spawn_blocking(move || {
                page_count_blocking(&bytes, password.as_deref(), library_path.as_deref())
            })
            .await
            .map_err(|e| DocumentError::Internal(format!("Open task panicked: {}", e)))??
        };
        info!("PDF loaded: {} pages", page_count);

        Ok(Box::new(PdfiumDocument {
            bytes,
            password,
            library_path,
            page_count,
        }))
    }
}

/// An opened PDF, addressed page by page.
pub struct PdfiumDocument {
    bytes: Arc<Vec<u8>>,
    password: Option<String>,
    library_path: Option<PathBuf>,
    page_count: usize,
}

#[async_trait]
impl ParsedDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_text(&self, page_num: usize) -> Result<PageText, DocumentError> {
        if page_num == 0 || page_num > self.page_count {
            return Err(DocumentError::PageOutOfRange {
                page: page_num,
                total: self.page_count,
            });
        }

        let bytes = Arc::clone(&self.bytes);
        let password = self.password.clone();
        let library_path = self.library_path.clone();

        let items = tokio::task::spawn_blocking(move || {
            page_text_blocking(&bytes, password.as_deref(), library_path.as_deref(), page_num)
        })
        .await
        .map_err(|e| DocumentError::Internal(format!("Page task panicked: {}", e)))??;

        debug!("Page {}: {} text segments", page_num, items.len());
        Ok(PageText::new(page_num, items))
    }
}

/// Bind to libpdfium: an explicit path wins, otherwise the system library.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, DocumentError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DocumentError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// The `%PDF-` header must start within this many bytes. pdfium tolerates
/// leading junk (BOMs, mail or HTTP preambles) before it.
const HEADER_SEARCH_WINDOW: usize = 1024;

fn check_magic(bytes: &[u8]) -> Result<(), DocumentError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW + 4)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }
    Err(DocumentError::NotAPdf {
        magic: bytes.iter().take(4).copied().collect(),
    })
}

fn map_load_error(e: PdfiumError, password: Option<&str>) -> DocumentError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            DocumentError::WrongPassword
        } else {
            DocumentError::PasswordRequired
        }
    } else {
        DocumentError::CorruptPdf { detail: err_str }
    }
}

fn page_count_blocking(
    bytes: &[u8],
    password: Option<&str>,
    library_path: Option<&Path>,
) -> Result<usize, DocumentError> {
    let pdfium = bind_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(e, password))?;

    let count = document.pages().len() as usize;
    Ok(count)
}

fn page_text_blocking(
    bytes: &[u8],
    password: Option<&str>,
    library_path: Option<&Path>,
    page_num: usize,
) -> Result<Vec<String>, DocumentError> {
    let pdfium = bind_pdfium(library_path)?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(e, password))?;

    let page = document
        .pages()
        .get((page_num - 1) as PdfPageIndex)
        .map_err(|e| DocumentError::PageTextFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let text = page.text().map_err(|e| DocumentError::PageTextFailed {
        page: page_num,
        detail: format!("{:?}", e),
    })?;

    let items: Vec<String> = text
        .segments()
        .iter()
        .map(|segment| segment.text())
        .collect();
    Ok(items)
}
