//! Pipeline stages and the external capabilities they consume.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document (pdfium) ──▶ page texts ──▶ buffer ──▶ generate
//! (handle)  (open, page count)    (sequential)   (joined)   (HTTP POST)
//! ```
//!
//! 1. [`input`]:    turn a path, byte buffer or URL into raw bytes
//! 2. [`document`]: the parsing contract (open, page count, page text)
//! 3. [`pdfium`]:   the production parser; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 4. [`generate`]: the generation contract and its reqwest client; the only
//!    stage that talks to the generation service

pub mod document;
pub mod generate;
pub mod input;
pub mod pdfium;
