//! # notes2pdf
//!
//! Turn OCR text from handwritten notes into a structured, Harvard-styled
//! academic PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! OCR text (+ optional instructions)
//!  │
//!  ├─ 1. Structure  model call #1 → StructuredDocument (fallback on any failure)
//!  ├─ 2. HTML       model call #2 → styled HTML, code fences stripped
//!  └─ 3. PDF        headless Chromium → A4, 1-inch margins, backgrounds
//! ```
//!
//! Structuring never fails: an unusable model answer becomes a fixed
//! "Untitled Document" with the raw text as its only chapter, so every valid
//! request yields a document. HTML and PDF failures are reported as
//! [`Notes2PdfError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notes2pdf::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = PipelineConfig::default();
//!     let output = convert("Lecture 2 - cell membranes ...", None, &config).await?;
//!     std::fs::write("notes.pdf", &output.pdf)?;
//!     if let Some(reason) = output.fallback_reason() {
//!         eprintln!("used fallback structure: {reason}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The actix-web HTTP API and presentation page ([`server`]) |
//! | `cli`    | on      | The `notes2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable both when using only the library:
//! ```toml
//! notes2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Testing without a model or a browser
//!
//! [`testing::ScriptedBackend`] and [`testing::FakeLauncher`] plug into
//! [`PipelineConfigBuilder::backend`] and [`PipelineConfigBuilder::launcher`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod testing;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PaperSize, PdfOptions, PipelineConfig, PipelineConfigBuilder};
pub use convert::{
    convert, convert_sync, convert_to_files, generate_html, generate_pdf, structure,
    with_resolved_backends,
};
pub use document::{Chapter, Reference, StructuredDocument, StructuringOutcome, Subchapter};
pub use error::{Notes2PdfError, StructuringError};
pub use output::{ConversionOutput, ConversionStats, HtmlOutput};
pub use pipeline::chromium::ChromiumLauncher;
pub use pipeline::llm::{CompletionBackend, ProviderBackend};
pub use pipeline::pdf::{BrowserLauncher, BrowserSession};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
