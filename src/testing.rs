//! In-process stand-ins for the model and the browser.
//!
//! [`ScriptedBackend`] replays queued answers and records every prompt it
//! receives; [`FakeLauncher`] hands out sessions that produce a tiny PDF and
//! count launches and closes. Both plug into
//! [`crate::config::PipelineConfigBuilder::backend`] and
//! [`crate::config::PipelineConfigBuilder::launcher`], so the whole pipeline
//! (and the HTTP server) runs without network access or Chromium.
//!
//! ```rust
//! use notes2pdf::testing::{FakeLauncher, ScriptedBackend};
//! use notes2pdf::PipelineConfig;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(ScriptedBackend::new().with_response("{\"title\":\"T\"}"));
//! let launcher = Arc::new(FakeLauncher::new());
//! let config = PipelineConfig::builder()
//!     .backend(backend.clone())
//!     .launcher(launcher.clone())
//!     .build()
//!     .unwrap();
//! ```

use crate::config::PdfOptions;
use crate::error::Notes2PdfError;
use crate::pipeline::llm::{Completion, CompletionBackend, CompletionSettings, Prompt};
use crate::pipeline::pdf::{BrowserLauncher, BrowserSession};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Bytes every fake session "prints".
pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n% notes2pdf test document\n%%EOF\n";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Model ────────────────────────────────────────────────────────────────────

/// A [`CompletionBackend`] that answers from a queue.
///
/// When the queue runs dry every further call fails with
/// `"no scripted response left"`.
#[derive(Default)]
pub struct ScriptedBackend {
    answers: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<(Prompt, CompletionSettings)>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.answers).push_back(Ok(content.into()));
        self
    }

    /// Queue a failed call.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.answers).push_back(Err(message.into()));
        self
    }

    /// Sleep this long before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received so far, with the settings it came with.
    pub fn calls(&self) -> Vec<(Prompt, CompletionSettings)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
    ) -> Result<Completion, String> {
        lock(&self.calls).push((prompt.clone(), *settings));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let answer = lock(&self.answers)
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response left".to_string()))?;
        Ok(Completion {
            prompt_tokens: (prompt.system.len() + prompt.user.len()) as u64 / 4,
            completion_tokens: answer.len() as u64 / 4,
            content: answer,
        })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

// ── Browser ──────────────────────────────────────────────────────────────────

/// A browser step a [`FakeLauncher`] can be told to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeStep {
    Launch,
    Load,
    Print,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Fail(FakeStep),
    Hang(FakeStep),
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
    loaded: Mutex<Vec<String>>,
}

/// A [`BrowserLauncher`] whose sessions never touch a real browser.
#[derive(Default)]
pub struct FakeLauncher {
    counters: Arc<Counters>,
    fault: Option<Fault>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step` return an error.
    pub fn failing_at(mut self, step: FakeStep) -> Self {
        self.fault = Some(Fault::Fail(step));
        self
    }

    /// Make `step` never complete.
    pub fn hanging_at(mut self, step: FakeStep) -> Self {
        self.fault = Some(Fault::Hang(step));
        self
    }

    /// Successful launches so far.
    pub fn launches(&self) -> usize {
        self.counters.launches.load(Ordering::SeqCst)
    }

    /// Calls to `close` so far, including failed ones.
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// HTML handed to `load_html`, in order.
    pub fn loaded_html(&self) -> Vec<String> {
        lock(&self.counters.loaded).clone()
    }

    async fn inject(fault: Option<Fault>, step: FakeStep) -> Result<(), Notes2PdfError> {
        match fault {
            Some(Fault::Hang(s)) if s == step => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Fault::Fail(s)) if s == step => Err(match step {
                FakeStep::Launch => Notes2PdfError::BrowserLaunchFailed {
                    detail: "fake launch failure".into(),
                },
                FakeStep::Load => Notes2PdfError::PageLoadFailed {
                    detail: "fake load failure".into(),
                },
                FakeStep::Print => Notes2PdfError::PdfExportFailed {
                    detail: "fake print failure".into(),
                },
                FakeStep::Close => Notes2PdfError::Internal("fake close failure".into()),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(
        &self,
        _options: &PdfOptions,
    ) -> Result<Box<dyn BrowserSession>, Notes2PdfError> {
        Self::inject(self.fault, FakeStep::Launch).await?;
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            counters: Arc::clone(&self.counters),
            fault: self.fault,
            loaded: false,
        }))
    }
}

struct FakeSession {
    counters: Arc<Counters>,
    fault: Option<Fault>,
    loaded: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn load_html(&mut self, html: &str) -> Result<(), Notes2PdfError> {
        FakeLauncher::inject(self.fault, FakeStep::Load).await?;
        lock(&self.counters.loaded).push(html.to_string());
        self.loaded = true;
        Ok(())
    }

    async fn print_pdf(&mut self, _options: &PdfOptions) -> Result<Vec<u8>, Notes2PdfError> {
        FakeLauncher::inject(self.fault, FakeStep::Print).await?;
        if !self.loaded {
            return Err(Notes2PdfError::PdfExportFailed {
                detail: "no page loaded".into(),
            });
        }
        Ok(FAKE_PDF.to_vec())
    }

    async fn close(&mut self) -> Result<(), Notes2PdfError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        FakeLauncher::inject(self.fault, FakeStep::Close).await
    }
}
