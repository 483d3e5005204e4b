//! HTML stage: [`StructuredDocument`] → styled HTML document.

use crate::config::PipelineConfig;
use crate::document::StructuredDocument;
use crate::error::Notes2PdfError;
use crate::pipeline::llm::{run_completion, CompletionBackend, Prompt};
use crate::pipeline::postprocess::{contains_script, strip_code_fences};
use crate::prompts::{rendering_user_message, RENDERING_SYSTEM_PROMPT};
use tracing::{info, warn};

/// Ask the model to render `document` as HTML and strip any fences it added.
///
/// # Errors
/// - [`Notes2PdfError::LlmApiError`] / [`Notes2PdfError::LlmTimeout`] when
///   the call fails
/// - [`Notes2PdfError::EmptyHtml`] when nothing is left after fence removal
pub async fn render_html(
    backend: &dyn CompletionBackend,
    document: &StructuredDocument,
    config: &PipelineConfig,
) -> Result<String, Notes2PdfError> {
    let document_json = serde_json::to_string(document)?;
    let prompt = Prompt {
        system: config
            .rendering_prompt
            .clone()
            .unwrap_or_else(|| RENDERING_SYSTEM_PROMPT.to_string()),
        user: rendering_user_message(&document_json),
    };

    let completion = run_completion(backend, &prompt, config, "html").await?;
    let html = strip_code_fences(&completion.content);
    if html.is_empty() {
        return Err(Notes2PdfError::EmptyHtml);
    }
    if contains_script(&html) {
        warn!("Rendered HTML contains <script>; it is passed through unsanitised");
    }

    info!("Rendered HTML: {} bytes", html.len());
    Ok(html)
}
