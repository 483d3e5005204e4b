//! Pipeline stages for notes-to-PDF conversion.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the model and browser can be swapped behind their traits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ structure ──▶ html ──▶ pdf
//! (text)    (model #1)   (model #2) (headless browser)
//! ```
//!
//! 1. [`input`]       — read OCR text from a file, stdin or URL (CLI only)
//! 2. [`structure`]   — model call #1; never fails, falls back instead
//! 3. [`html`]        — model call #2; fences stripped
//! 4. [`pdf`]         — browser seam and the close-exactly-once discipline;
//!    [`chromium`] is the production browser
//!
//! [`llm`] is the shared completion seam and [`postprocess`] the
//! deterministic cleanup both model stages rely on.

pub mod chromium;
pub mod html;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod postprocess;
pub mod structure;
