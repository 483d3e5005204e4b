//! Result types returned by the entry points in [`crate::convert`].

use crate::document::{StructuredDocument, StructuringOutcome};
use crate::error::StructuringError;
use serde::Serialize;

/// Output of [`crate::generate_html`].
#[derive(Debug, Clone)]
pub struct HtmlOutput {
    /// Fence-free HTML from the rendering call.
    pub html: String,
    /// What the structuring step produced (model answer or fallback).
    pub structuring: StructuringOutcome,
    pub stats: ConversionStats,
}

/// Output of [`crate::convert`].
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub structuring: StructuringOutcome,
    pub html: String,
    /// PDF bytes; always starts with `%PDF` when produced by Chromium.
    pub pdf: Vec<u8>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    pub fn document(&self) -> &StructuredDocument {
        self.structuring.document()
    }

    pub fn fallback_reason(&self) -> Option<&StructuringError> {
        self.structuring.fallback_reason()
    }
}

/// Sizes and timings of one run. Stages that did not run report zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub input_bytes: usize,
    pub html_bytes: usize,
    pub pdf_bytes: usize,
    pub chapters: usize,
    pub references: usize,
    pub used_fallback: bool,
    pub structuring_ms: u64,
    pub html_ms: u64,
    pub pdf_ms: u64,
    pub total_ms: u64,
}
