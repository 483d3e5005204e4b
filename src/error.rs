//! Error types for the notes2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Notes2PdfError`] — **Fatal**: the request cannot produce its output
//!   (missing input, provider not configured, browser failed). Returned as
//!   `Err(Notes2PdfError)` from the stage and `convert*` functions and
//!   surfaced at the HTTP boundary.
//!
//! * [`StructuringError`] — **Recovered**: the structuring model call or the
//!   parse of its answer failed, so the deterministic fallback document was
//!   used instead. Stored inside [`crate::document::StructuringOutcome`] so
//!   callers can see *why* the fallback happened without losing the request.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notes2pdf library.
///
/// Structuring failures use [`StructuringError`] and never reach this type.
#[derive(Debug, Error)]
pub enum Notes2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required input was missing or empty.
    #[error("{what} is required")]
    EmptyInput { what: &'static str },

    /// Input exceeds the configured size cap.
    #[error("Input is {len} bytes; the limit is {limit} bytes")]
    InputTooLarge { len: usize, limit: usize },

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is neither a file path, `-`, nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path, '-' or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// A model call exceeded the optional per-call timeout.
    #[error("LLM call for {stage} timed out after {secs}s")]
    LlmTimeout { stage: &'static str, secs: u64 },

    /// The rendering model answered with nothing but fences or whitespace.
    #[error("Model returned no HTML")]
    EmptyHtml,

    /// The structured document could not be serialised for the rendering call.
    #[error("Failed to serialise structured document: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Browser errors ────────────────────────────────────────────────────
    /// Chromium could not be started.
    #[error("Failed to launch headless browser: {detail}")]
    BrowserLaunchFailed { detail: String },

    /// A browser step exceeded the configured ceiling.
    #[error("Browser {stage} timed out after {secs}s")]
    BrowserTimeout { stage: &'static str, secs: u64 },

    /// Opening a page or loading the HTML into it failed.
    #[error("Failed to load HTML into the browser page: {detail}")]
    PageLoadFailed { detail: String },

    /// Printing the loaded page to PDF failed.
    #[error("Failed to export PDF: {detail}")]
    PdfExportFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Notes2PdfError {
    /// `true` for errors caused by the caller's input rather than the
    /// pipeline; the HTTP layer answers these with 400.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Notes2PdfError::EmptyInput { .. } | Notes2PdfError::InputTooLarge { .. }
        )
    }
}

/// Why the structuring step fell back to the deterministic document.
///
/// Stored in [`crate::document::StructuringOutcome::Fallback`]; never
/// returned as an `Err`.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum StructuringError {
    /// The model call itself failed (network, auth, timeout).
    #[error("model call failed: {0}")]
    ModelCallFailed(String),

    /// The answer contained nothing that could be a JSON object.
    #[error("model answer contained no JSON object")]
    NoJsonObject,

    /// The extracted text was not valid JSON.
    #[error("model answer was not valid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON, but not shaped like a structured document.
    #[error("model answer did not match the document schema: {0}")]
    SchemaViolation(String),
}
