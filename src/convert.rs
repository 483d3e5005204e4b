//! Entry points: each stage on its own, and the whole pipeline end to end.
//!
//! The HTTP handlers call [`generate_html`] and [`generate_pdf`] (one per
//! endpoint, matching the two calls the browser page makes); the CLI calls
//! [`convert`] or [`convert_to_files`] to run everything in one process.

use crate::config::PipelineConfig;
use crate::document::StructuringOutcome;
use crate::error::Notes2PdfError;
use crate::output::{ConversionOutput, ConversionStats, HtmlOutput};
use crate::pipeline::chromium::ChromiumLauncher;
use crate::pipeline::input::check_size;
use crate::pipeline::llm::{CompletionBackend, ProviderBackend};
use crate::pipeline::pdf::BrowserLauncher;
use crate::pipeline::{html, pdf, structure as structuring};
use crate::progress::Stage;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Structure OCR text into an academic document.
///
/// # Errors
/// Only input validation and provider resolution fail; model problems
/// produce [`StructuringOutcome::Fallback`].
pub async fn structure(
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> Result<StructuringOutcome, Notes2PdfError> {
    validate_text(content, "Content", config)?;
    let backend = resolve_backend(config)?;
    Ok(run_structuring(backend.as_ref(), content, instructions, config).await)
}

/// Structure OCR text and render it as HTML (`POST /api/resume/html`).
pub async fn generate_html(
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> Result<HtmlOutput, Notes2PdfError> {
    let total_start = Instant::now();
    validate_text(content, "Content", config)?;
    let backend = resolve_backend(config)?;

    let structuring_start = Instant::now();
    let outcome = run_structuring(backend.as_ref(), content, instructions, config).await;
    let structuring_ms = structuring_start.elapsed().as_millis() as u64;

    let html_start = Instant::now();
    let html = run_html(backend.as_ref(), &outcome, config).await?;
    let html_ms = html_start.elapsed().as_millis() as u64;

    let document = outcome.document();
    let stats = ConversionStats {
        input_bytes: content.len(),
        html_bytes: html.len(),
        chapters: document.chapter_count(),
        references: document.reference_count(),
        used_fallback: outcome.is_fallback(),
        structuring_ms,
        html_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
        ..Default::default()
    };

    Ok(HtmlOutput {
        html,
        structuring: outcome,
        stats,
    })
}

/// Print HTML to PDF with a fresh headless browser (`POST /api/resume/pdf`).
pub async fn generate_pdf(html: &str, config: &PipelineConfig) -> Result<Vec<u8>, Notes2PdfError> {
    validate_text(html, "HTML", config)?;
    let launcher = resolve_launcher(config);
    run_pdf(launcher.as_ref(), html, config).await
}

/// Run all three stages: OCR text → structured document → HTML → PDF.
///
/// # Example
/// ```rust,no_run
/// use notes2pdf::{convert, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::default();
/// let output = convert("Lecture 4 - photosynthesis ...", None, &config).await?;
/// std::fs::write("notes.pdf", &output.pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> Result<ConversionOutput, Notes2PdfError> {
    let total_start = Instant::now();
    info!("Starting conversion: {} bytes of OCR text", content.len());

    let html_output = generate_html(content, instructions, config).await?;

    let launcher = resolve_launcher(config);
    let pdf_start = Instant::now();
    let pdf = run_pdf(launcher.as_ref(), &html_output.html, config).await?;

    let stats = ConversionStats {
        pdf_bytes: pdf.len(),
        pdf_ms: pdf_start.elapsed().as_millis() as u64,
        total_ms: total_start.elapsed().as_millis() as u64,
        ..html_output.stats
    };

    info!(
        "Conversion complete: {} chapters, {} bytes of PDF, {}ms total{}",
        stats.chapters,
        stats.pdf_bytes,
        stats.total_ms,
        if stats.used_fallback { " (fallback document)" } else { "" }
    );

    Ok(ConversionOutput {
        structuring: html_output.structuring,
        html: html_output.html,
        pdf,
        stats,
    })
}

/// Run [`convert`] and write the PDF (and optionally the HTML) to disk.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_files(
    content: &str,
    instructions: Option<&str>,
    pdf_path: impl AsRef<Path>,
    html_path: Option<&Path>,
    config: &PipelineConfig,
) -> Result<ConversionStats, Notes2PdfError> {
    let output = convert(content, instructions, config).await?;
    write_atomic(pdf_path.as_ref(), &output.pdf).await?;
    if let Some(path) = html_path {
        write_atomic(path, output.html.as_bytes()).await?;
    }
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> Result<ConversionOutput, Notes2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Notes2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(content, instructions, config))
}

/// Return a copy of `config` with the backend and launcher resolved.
///
/// Long-running callers (the HTTP server) call this once at startup so a
/// missing API key is reported before the first request, and every request
/// shares one provider client.
pub fn with_resolved_backends(config: &PipelineConfig) -> Result<PipelineConfig, Notes2PdfError> {
    let mut resolved = config.clone();
    resolved.backend = Some(resolve_backend(config)?);
    resolved.launcher = Some(resolve_launcher(config));
    Ok(resolved)
}

/// Resolve the completion backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`) — used as-is (tests).
/// 2. **Pre-built provider** (`config.provider`) — wrapped in a
///    [`ProviderBackend`].
/// 3. **Named provider** (`config.provider_name`) — built by
///    [`ProviderFactory::create_llm_provider`] with `config.model`, reading
///    the matching API key from the environment.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 5. **`OPENAI_API_KEY`** — OpenAI with the configured or default model.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_backend(
    config: &PipelineConfig,
) -> Result<Arc<dyn CompletionBackend>, Notes2PdfError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref provider) = config.provider {
        let label = format!("custom/{}", config.model_or_default());
        return Ok(Arc::new(ProviderBackend::new(Arc::clone(provider), label)));
    }

    if let Some(ref name) = config.provider_name {
        return create_backend(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_backend(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_backend("openai", config.model_or_default());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Notes2PdfError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;
    Ok(Arc::new(ProviderBackend::new(llm_provider, "auto")))
}

/// The configured launcher, or headless Chromium.
pub fn resolve_launcher(config: &PipelineConfig) -> Arc<dyn BrowserLauncher> {
    match config.launcher {
        Some(ref launcher) => Arc::clone(launcher),
        None => Arc::new(ChromiumLauncher::new()),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_backend(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn CompletionBackend>, Notes2PdfError> {
    let provider: Arc<dyn LLMProvider> = ProviderFactory::create_llm_provider(provider_name, model)
        .map_err(|e| Notes2PdfError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        })?;
    Ok(Arc::new(ProviderBackend::new(
        provider,
        format!("{provider_name}/{model}"),
    )))
}

/// Blank text is a missing input; oversized text is rejected before any
/// model or browser work starts.
fn validate_text(
    text: &str,
    what: &'static str,
    config: &PipelineConfig,
) -> Result<(), Notes2PdfError> {
    if text.trim().is_empty() {
        return Err(Notes2PdfError::EmptyInput { what });
    }
    check_size(text, config.max_input_bytes)
}

async fn run_structuring(
    backend: &dyn CompletionBackend,
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> StructuringOutcome {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Structuring);
    }
    let outcome = structuring::structure_content(backend, content, instructions, config).await;
    if let Some(ref cb) = config.progress_callback {
        if let Some(reason) = outcome.fallback_reason() {
            cb.on_fallback(reason);
        }
        let json_len = serde_json::to_vec(outcome.document()).map_or(0, |v| v.len());
        cb.on_stage_complete(Stage::Structuring, json_len);
    }
    outcome
}

async fn run_html(
    backend: &dyn CompletionBackend,
    outcome: &StructuringOutcome,
    config: &PipelineConfig,
) -> Result<String, Notes2PdfError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Html);
    }
    let result = html::render_html(backend, outcome.document(), config).await;
    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(html) => cb.on_stage_complete(Stage::Html, html.len()),
            Err(e) => cb.on_stage_error(Stage::Html, &e.to_string()),
        }
    }
    result
}

async fn run_pdf(
    launcher: &dyn BrowserLauncher,
    html: &str,
    config: &PipelineConfig,
) -> Result<Vec<u8>, Notes2PdfError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Pdf);
    }
    let result = pdf::render_pdf(launcher, html, &config.pdf).await;
    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(bytes) => cb.on_stage_complete(Stage::Pdf, bytes.len()),
            Err(e) => cb.on_stage_error(Stage::Pdf, &e.to_string()),
        }
    }
    result
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Notes2PdfError> {
    let write_failed = |source| Notes2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_failed(e));
    }
    Ok(())
}
