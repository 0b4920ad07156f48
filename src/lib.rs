//! # edgequake-pdf2study
//!
//! Turn a PDF (lecture slides, course notes) into a summary, a quiz and
//! assignment ideas.
//!
//! Text is extracted locally with pdfium, page by page, and sent to a
//! generation service in a single request. The service owns every prompt and
//! model decision; this crate owns the sequencing: reading pages in order,
//! publishing a complete buffer or nothing, and keeping a late response from
//! overwriting a newer one.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     file path, in-memory bytes, or URL download
//!  ├─ 2. Open      pdfium (spawn_blocking), page count
//!  ├─ 3. Extract   page 1..=N sequentially, fragments joined by " ", "\n\n" per page
//!  ├─ 4. Generate  POST { text, mode } → { summary?, quiz?, assignments? }
//!  └─ 5. Publish   SessionState (watch channel) → CLI / UI
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2study::{DocumentHandle, FlowOutcome, GenerationMode, StudyConfig, StudySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StudyConfig::builder()
//!         .endpoint("http://localhost:8000/api/generate")
//!         .build()?;
//!     let session = StudySession::new(config)?;
//!
//!     session.select_document(DocumentHandle::from_path("lecture.pdf"));
//!     if let FlowOutcome::Failed(msg) = session.extract().await? {
//!         eprintln!("{msg}");
//!         return Ok(());
//!     }
//!
//!     session.set_mode(GenerationMode::Quiz);
//!     session.generate().await?;
//!     println!("{}", session.state().results.to_markdown());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2study` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2study = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! The pdfium shared library is loaded at runtime, from
//! [`StudyConfig::pdfium_library`] when set, otherwise from the system library
//! search path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationMode, StudyConfig, StudyConfigBuilder, DEFAULT_ENDPOINT};
pub use error::{DocumentError, RequestError, StudyError};
pub use extract::{extract_document_text, extract_text, extract_text_sync, extract_with, inspect, inspect_with};
pub use output::{DocumentInfo, ResultSet};
pub use pipeline::document::{DocumentParser, PageText, ParsedDocument};
pub use pipeline::generate::{GenerateRequest, GenerateResponse, GenerationClient, HttpGenerationClient};
pub use pipeline::input::DocumentHandle;
pub use pipeline::pdfium::PdfiumParser;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{FlowOutcome, SessionState, StudySession};
pub use stream::{extract_stream, page_texts, PageTextStream};
