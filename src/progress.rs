//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as a request moves through structuring, HTML rendering and PDF
//! rendering. The CLI draws a spinner from these; a server could forward them
//! to a log or a websocket without the library knowing about either.
//!
//! # Example
//!
//! ```rust
//! use notes2pdf::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done ({output_len} bytes)");
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::StructuringError;
use std::fmt;
use std::sync::Arc;

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    /// OCR text → structured document (model call 1).
    Structuring,
    /// Structured document → HTML (model call 2).
    Html,
    /// HTML → PDF (headless browser).
    Pdf,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Structuring => "structuring",
            Stage::Html => "HTML rendering",
            Stage::Pdf => "PDF rendering",
        })
    }
}

/// Called by the pipeline as each stage starts and finishes.
///
/// Implementations must be `Send + Sync`: the server shares one config across
/// every worker. All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage produced its output.
    ///
    /// # Arguments
    /// * `stage`      — the finished stage
    /// * `output_len` — bytes of output (serialised JSON, HTML, or PDF)
    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        let _ = (stage, output_len);
    }

    /// Called when a stage fails fatally.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called when the structuring step substituted the fallback document.
    /// `on_stage_complete(Stage::Structuring, …)` still follows.
    fn on_fallback(&self, reason: &StructuringError) {
        let _ = reason;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
