//! Configuration types for the notes-to-PDF pipeline.
//!
//! Every pipeline knob lives in [`PipelineConfig`], built via
//! [`PipelineConfigBuilder`]. The server holds one config behind an `Arc` and
//! shares it across workers; the CLI builds one per invocation.

use crate::error::Notes2PdfError;
use crate::pipeline::llm::CompletionBackend;
use crate::pipeline::pdf::BrowserLauncher;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default cap on OCR text and HTML payload size (256 KiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 256 * 1024;

/// Configuration for one pipeline run (or for every request a server handles).
///
/// # Example
/// ```rust
/// use notes2pdf::{PaperSize, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.2)
///     .paper(PaperSize::Letter)
///     .pdf_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.pdf.timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Model identifier, e.g. "gpt-4o-mini". If None, [`DEFAULT_MODEL`] is
    /// used whenever a provider has to be constructed.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake provider. Takes precedence over
    /// `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed completion backend. Takes precedence over `provider`;
    /// tests inject scripted backends here.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Browser launcher. If None, a Chromium launcher is built from `pdf`.
    pub launcher: Option<Arc<dyn BrowserLauncher>>,

    /// Sampling temperature for both model calls. Default: 0.2.
    pub temperature: f32,

    /// Output token ceiling per model call. None leaves it to the provider.
    pub max_tokens: Option<usize>,

    /// Override for the structuring system prompt.
    pub structuring_prompt: Option<String>,

    /// Override for the rendering system prompt.
    pub rendering_prompt: Option<String>,

    /// Maximum accepted size of OCR text or HTML, in bytes. Default: 256 KiB.
    pub max_input_bytes: usize,

    /// Per-model-call timeout in seconds. Default: None (no ceiling).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Headless-browser PDF settings.
    pub pdf: PdfOptions,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            launcher: None,
            temperature: 0.2,
            max_tokens: None,
            structuring_prompt: None,
            rendering_prompt: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            pdf: PdfOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .field("launcher", &self.launcher.as_ref().map(|_| "<dyn BrowserLauncher>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("structuring_prompt", &self.structuring_prompt.is_some())
            .field("rendering_prompt", &self.rendering_prompt.is_some())
            .field("max_input_bytes", &self.max_input_bytes)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("pdf", &self.pdf)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model name to hand to a provider factory.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.config.launcher = Some(launcher);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn structuring_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.structuring_prompt = Some(prompt.into());
        self
    }

    pub fn rendering_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.rendering_prompt = Some(prompt.into());
        self
    }

    pub fn max_input_bytes(mut self, n: usize) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn pdf_options(mut self, pdf: PdfOptions) -> Self {
        self.config.pdf = pdf;
        self
    }

    pub fn paper(mut self, paper: PaperSize) -> Self {
        self.config.pdf.paper = paper;
        self
    }

    pub fn margin_inches(mut self, inches: f64) -> Self {
        self.config.pdf.margin_inches = inches.clamp(0.0, 3.0);
        self
    }

    pub fn pdf_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdf.timeout_secs = secs;
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf.executable = Some(path.into());
        self
    }

    pub fn disable_sandbox(mut self, v: bool) -> Self {
        self.config.pdf.disable_sandbox = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Notes2PdfError> {
        let c = &self.config;
        if c.max_input_bytes == 0 {
            return Err(Notes2PdfError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == Some(0) {
            return Err(Notes2PdfError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Notes2PdfError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        c.pdf.validate()?;
        Ok(self.config)
    }
}

// ── PDF options ──────────────────────────────────────────────────────────

/// Page size for the printed PDF.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    /// 8.27 × 11.69 in. (default)
    #[default]
    A4,
    /// 8.5 × 11 in.
    Letter,
    /// Arbitrary size in inches.
    Custom { width_in: f64, height_in: f64 },
}

impl PaperSize {
    /// `(width, height)` in inches.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match *self {
            PaperSize::A4 => (8.27, 11.69),
            PaperSize::Letter => (8.5, 11.0),
            PaperSize::Custom {
                width_in,
                height_in,
            } => (width_in, height_in),
        }
    }
}

/// How the headless browser launches and prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    /// Page size. Default: A4.
    pub paper: PaperSize,
    /// Margin on all four sides, in inches. Default: 1.0.
    pub margin_inches: f64,
    /// Print CSS backgrounds. Default: true.
    pub print_background: bool,
    /// Ceiling for each browser step (launch, load, print). Default: 60.
    pub timeout_secs: u64,
    /// Explicit Chromium binary. Otherwise resolved by `chrome-locate`.
    pub executable: Option<PathBuf>,
    /// Pass `--no-sandbox --disable-setuid-sandbox`. Default: true, since
    /// containers usually run Chromium as root.
    pub disable_sandbox: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            paper: PaperSize::A4,
            margin_inches: 1.0,
            print_background: true,
            timeout_secs: 60,
            executable: None,
            disable_sandbox: true,
        }
    }
}

impl PdfOptions {
    fn validate(&self) -> Result<(), Notes2PdfError> {
        if self.timeout_secs == 0 {
            return Err(Notes2PdfError::InvalidConfig(
                "PDF timeout must be ≥ 1 second".into(),
            ));
        }
        let (w, h) = self.paper.dimensions_in();
        if !(w > 0.0 && h > 0.0) {
            return Err(Notes2PdfError::InvalidConfig(format!(
                "paper size must be positive, got {w} × {h} in"
            )));
        }
        if self.margin_inches * 2.0 >= w.min(h) {
            return Err(Notes2PdfError::InvalidConfig(format!(
                "margins of {} in leave no printable area on a {w} × {h} in page",
                self.margin_inches
            )));
        }
        Ok(())
    }
}
