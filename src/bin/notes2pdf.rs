//! CLI binary for notes2pdf.
//!
//! A thin shim over the library crate: `serve` runs the HTTP API, `render`
//! and `structure` run the pipeline once from a file, stdin or URL.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use notes2pdf::config::DEFAULT_MAX_INPUT_BYTES;
use notes2pdf::pipeline::input::resolve_text_input;
use notes2pdf::server::{self, AppState, ServerOptions, DEFAULT_BIND};
use notes2pdf::{
    convert_to_files, structure, PaperSize, PipelineConfig, PipelineProgressCallback,
    ProgressCallback, Stage, StructuringError,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner for the three stages, with a log line as each finishes.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_started: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .stage_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        format!("{secs:.1}s")
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        *self
            .stage_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(match stage {
            Stage::Structuring => "asking the model to organise the notes…",
            Stage::Html => "asking the model to typeset the document…",
            Stage::Pdf => "printing with headless Chromium…",
        });
    }

    fn on_stage_complete(&self, stage: Stage, output_len: usize) {
        self.bar.println(format!(
            "  {} {:<15} {}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{output_len:>8} bytes")),
            dim(&self.elapsed()),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<15} {}  {}",
            red("✗"),
            stage.to_string(),
            red(&msg),
            dim(&self.elapsed()),
        ));
    }

    fn on_fallback(&self, reason: &StructuringError) {
        self.bar.println(format!(
            "  {} using fallback structure: {}",
            yellow("⚠"),
            reason
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the web app on http://127.0.0.1:3000
  notes2pdf serve

  # Listen on all interfaces with 4 workers
  notes2pdf serve --bind 0.0.0.0:8080 --workers 4

  # OCR text file → PDF (and keep the HTML)
  notes2pdf render lecture-notes.txt -o notes.pdf --html notes.html

  # From stdin, with extra instructions
  cat notes.txt | notes2pdf render - -o notes.pdf -i "Use British spelling"

  # Just the structured JSON
  notes2pdf structure notes.txt > notes.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY             OpenAI API key
  ANTHROPIC_API_KEY          Anthropic API key
  GEMINI_API_KEY             Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER     Provider to auto-select (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL            Model ID
  CHROME_EXECUTABLE_PATH     Chrome/Chromium binary to launch
  PUPPETEER_EXECUTABLE_PATH  Same, honoured for existing deployments
  DYNO                       Set on Heroku; selects the chrome-for-testing path
  RUST_LOG                   Log filter, overrides -v / -q
"#;

/// Turn OCR text from handwritten notes into an academic PDF.
#[derive(Parser, Debug)]
#[command(
    name = "notes2pdf",
    version,
    about = "Turn OCR text from handwritten notes into an academic PDF",
    long_about = "Structure OCR text from handwritten notes into an academic document with a \
chat-completion model, typeset it as Harvard-styled HTML, and print it to PDF with headless \
Chromium. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible \
endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTES2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTES2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API and the web page.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "NOTES2PDF_BIND", default_value = DEFAULT_BIND)]
        bind: String,

        /// Worker threads (default: one per CPU core).
        #[arg(long, env = "NOTES2PDF_WORKERS")]
        workers: Option<usize>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Convert OCR text to a PDF file.
    Render {
        /// Text file path, `-` for stdin, or HTTP/HTTPS URL.
        input: String,

        /// Where to write the PDF.
        #[arg(short, long, env = "NOTES2PDF_OUTPUT")]
        output: PathBuf,

        /// Also write the intermediate HTML here.
        #[arg(long)]
        html: Option<PathBuf>,

        /// Additional formatting instructions for the model.
        #[arg(short, long)]
        instructions: Option<String>,

        /// Disable the progress spinner.
        #[arg(long, env = "NOTES2PDF_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print the structured document as JSON.
    Structure {
        /// Text file path, `-` for stdin, or HTTP/HTTPS URL.
        input: String,

        /// Additional formatting instructions for the model.
        #[arg(short, long)]
        instructions: Option<String>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

/// Flags shared by every subcommand.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// LLM model ID (e.g. gpt-4o-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "NOTES2PDF_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per model call.
    #[arg(long, env = "NOTES2PDF_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Per-model-call timeout in seconds (default: none).
    #[arg(long, env = "NOTES2PDF_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "NOTES2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Largest accepted OCR text or HTML, in bytes.
    #[arg(long, env = "NOTES2PDF_MAX_INPUT_BYTES", default_value_t = DEFAULT_MAX_INPUT_BYTES)]
    max_input_bytes: usize,

    /// Chrome/Chromium executable (overrides CHROME_EXECUTABLE_PATH).
    #[arg(long, env = "NOTES2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Ceiling for each browser step in seconds.
    #[arg(long, env = "NOTES2PDF_PDF_TIMEOUT", default_value_t = 60)]
    pdf_timeout: u64,

    /// Paper size.
    #[arg(long, env = "NOTES2PDF_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Keep Chromium's sandbox enabled (off by default for containers).
    #[arg(long, env = "NOTES2PDF_SANDBOX")]
    sandbox: bool,

    /// Text file replacing the built-in structuring prompt.
    #[arg(long, env = "NOTES2PDF_STRUCTURING_PROMPT")]
    structuring_prompt: Option<PathBuf>,

    /// Text file replacing the built-in rendering prompt.
    #[arg(long, env = "NOTES2PDF_RENDERING_PROMPT")]
    rendering_prompt: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A4,
    Letter,
}

impl From<PaperArg> for PaperSize {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback `render` needs; the server logs
    // every request at info.
    let spinner = matches!(cli.command, Command::Render { no_progress: false, .. }) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            workers,
            pipeline,
        } => {
            let config = build_config(&pipeline, None).await?;
            let state = AppState::new(&config).context("Failed to initialise the LLM provider")?;
            if !cli.quiet {
                eprintln!("{} serving on {}", green("◆"), bold(&format!("http://{bind}")));
            }
            server::run(state, &ServerOptions { bind, workers })
                .await
                .context("Server failed")?;
        }

        Command::Render {
            input,
            output,
            html,
            instructions,
            no_progress,
            pipeline,
        } => {
            let progress = (!cli.quiet && !no_progress).then(CliProgressCallback::new);
            let config = build_config(
                &pipeline,
                progress.clone().map(|cb| cb as ProgressCallback),
            )
            .await?;

            let content = read_input(&input, &config).await?;
            let result = convert_to_files(
                &content,
                instructions.as_deref(),
                &output,
                html.as_deref(),
                &config,
            )
            .await;
            if let Some(ref cb) = progress {
                cb.finish();
            }
            let stats = result.context("Conversion failed")?;

            if !cli.quiet {
                eprintln!(
                    "{}  {} chapters  {} references  {}ms  →  {}",
                    if stats.used_fallback { yellow("⚠") } else { green("✔") },
                    stats.chapters,
                    stats.references,
                    stats.total_ms,
                    bold(&output.display().to_string()),
                );
                if let Some(ref path) = html {
                    eprintln!("   HTML  →  {}", dim(&path.display().to_string()));
                }
            }
        }

        Command::Structure {
            input,
            instructions,
            pipeline,
        } => {
            let config = build_config(&pipeline, None).await?;
            let content = read_input(&input, &config).await?;
            let outcome = structure(&content, instructions.as_deref(), &config)
                .await
                .context("Structuring failed")?;

            if let Some(reason) = outcome.fallback_reason() {
                eprintln!("{} using fallback structure: {}", yellow("⚠"), reason);
            }
            let json = serde_json::to_string_pretty(outcome.document())
                .context("Failed to serialise document")?;
            println!("{json}");
        }
    }

    Ok(())
}

async fn read_input(input: &str, config: &PipelineConfig) -> Result<String> {
    resolve_text_input(input, config.download_timeout_secs, config.max_input_bytes)
        .await
        .with_context(|| format!("Failed to read input '{input}'"))
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(
    args: &PipelineArgs,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .temperature(args.temperature)
        .max_input_bytes(args.max_input_bytes)
        .download_timeout_secs(args.download_timeout)
        .pdf_timeout_secs(args.pdf_timeout)
        .paper(args.paper.into())
        .disable_sandbox(!args.sandbox);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = args.chrome {
        builder = builder.chrome_executable(path);
    }
    if let Some(ref path) = args.structuring_prompt {
        builder = builder.structuring_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = args.rendering_prompt {
        builder = builder.rendering_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}
