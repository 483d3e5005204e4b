//! Chat-completion calls: one system message, one user message, text back.
//!
//! Both model stages go through [`CompletionBackend`], a narrow
//! seam over `edgequake_llm::LLMProvider`. Production code wraps a provider in
//! [`ProviderBackend`]; tests substitute [`crate::testing::ScriptedBackend`].
//! Prompt wording lives in [`crate::prompts`]; nothing here knows which stage
//! is calling.
//!
//! No retries: a failed call is reported once and the caller decides whether
//! it is fatal (HTML stage) or recoverable (structuring stage).

use crate::config::PipelineConfig;
use crate::error::Notes2PdfError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// A system + user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Text returned by a completion, plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Sampling settings forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

impl CompletionSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Anything that can answer a single-turn chat completion.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion. Errors are returned as display strings; the
    /// stages map them onto their own error types.
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
    ) -> Result<Completion, String>;

    /// Human-readable identity for logs ("openai/gpt-4o-mini").
    fn describe(&self) -> String {
        "completion backend".to_string()
    }
}

/// [`CompletionBackend`] over an `edgequake_llm` provider.
#[derive(Clone)]
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    async fn complete(
        &self,
        prompt: &Prompt,
        settings: &CompletionSettings,
    ) -> Result<Completion, String> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = build_options(settings);
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| e.to_string())?;
        Ok(Completion {
            content: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Run one completion with the config's settings and optional timeout.
///
/// `stage` names the caller in logs and in [`Notes2PdfError::LlmTimeout`].
pub async fn run_completion(
    backend: &dyn CompletionBackend,
    prompt: &Prompt,
    config: &PipelineConfig,
    stage: &'static str,
) -> Result<Completion, Notes2PdfError> {
    let start = Instant::now();
    let settings = CompletionSettings::from_config(config);
    let call = backend.complete(prompt, &settings);

    let result = match config.api_timeout_secs {
        Some(secs) => timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| Notes2PdfError::LlmTimeout { stage, secs })?,
        None => call.await,
    };

    let completion = result.map_err(|message| Notes2PdfError::LlmApiError { message })?;
    debug!(
        "{}: {} input tokens, {} output tokens, {:?} via {}",
        stage,
        completion.prompt_tokens,
        completion.completion_tokens,
        start.elapsed(),
        backend.describe()
    );
    Ok(completion)
}

/// Build `CompletionOptions` from the sampling settings.
fn build_options(settings: &CompletionSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: settings.max_tokens,
        ..Default::default()
    }
}
