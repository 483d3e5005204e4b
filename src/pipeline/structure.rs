//! Structuring stage: OCR text → [`StructuredDocument`].
//!
//! The stage never fails. A model error, an answer without JSON, malformed
//! JSON or JSON of the wrong shape all produce
//! [`StructuringOutcome::Fallback`] carrying the raw text as a single chapter.

use crate::config::PipelineConfig;
use crate::document::{StructuredDocument, StructuringOutcome};
use crate::error::StructuringError;
use crate::pipeline::llm::{run_completion, CompletionBackend, Prompt};
use crate::pipeline::postprocess::extract_json_block;
use crate::prompts::{structuring_user_message, STRUCTURING_SYSTEM_PROMPT};
use serde_json::Value;
use tracing::{info, warn};

/// Ask the model to structure `content` and validate its answer.
pub async fn structure_content(
    backend: &dyn CompletionBackend,
    content: &str,
    instructions: Option<&str>,
    config: &PipelineConfig,
) -> StructuringOutcome {
    let prompt = Prompt {
        system: config
            .structuring_prompt
            .clone()
            .unwrap_or_else(|| STRUCTURING_SYSTEM_PROMPT.to_string()),
        user: structuring_user_message(content, instructions),
    };

    let answer = match run_completion(backend, &prompt, config, "structuring").await {
        Ok(completion) => completion.content,
        Err(e) => {
            warn!("Structuring call failed, using fallback document: {}", e);
            return StructuringOutcome::fallback(
                content,
                StructuringError::ModelCallFailed(e.to_string()),
            );
        }
    };

    match parse_structured(&answer) {
        Ok(document) => {
            info!(
                "Structured document: {} chapters, {} references",
                document.chapter_count(),
                document.reference_count()
            );
            StructuringOutcome::Structured(document)
        }
        Err(reason) => {
            warn!("Structuring answer rejected, using fallback document: {}", reason);
            StructuringOutcome::fallback(content, reason)
        }
    }
}

/// Extract, parse and schema-check a structuring answer.
pub fn parse_structured(answer: &str) -> Result<StructuredDocument, StructuringError> {
    let block = extract_json_block(answer);

    let value: Value = serde_json::from_str(&block).map_err(|e| {
        if block.contains('{') {
            StructuringError::InvalidJson(e.to_string())
        } else {
            StructuringError::NoJsonObject
        }
    })?;

    if !value.is_object() {
        return Err(StructuringError::SchemaViolation(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    }

    serde_json::from_value(value).map_err(|e| StructuringError::SchemaViolation(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
