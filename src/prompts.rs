//! System prompts and user-message templates for the two model calls.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the structuring rules or the
//!    styling directives means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live model, so prompt regressions are easy to catch.
//!
//! Callers can override either system prompt through
//! [`crate::config::PipelineConfig`]; the constants here are used only when no
//! override is provided.

/// Default system prompt for the structuring call.
///
/// The key list at the end mirrors [`crate::document::StructuredDocument`]'s
/// JSON field names so the model's answer deserializes without renaming.
pub const STRUCTURING_SYSTEM_PROMPT: &str = r#"You are an academic document structuring assistant. Your task is to analyze OCR text from handwritten notes and structure it into a well-organized academic document format.

Follow these guidelines:
1. Identify the document title, author, and abstract if present
2. Organize the content into logical chapters and subchapters
3. Extract and format references according to Harvard style
4. Create a table of contents based on the identified structure
5. Identify any appendices or supplementary material

Structure the content in a way that maintains the original meaning and flow while improving organization.
If the input is unclear or ambiguous, make reasonable assumptions based on academic writing conventions.

Return the structured content as a valid JSON object matching this schema (every field is optional, every value is a string or a list):
{
  "title": string,
  "author": string,
  "abstract": string,
  "tableOfContents": [string],
  "chapters": [{ "title": string, "content": string, "subchapters": [{ "title": string, "content": string }] }],
  "references": [{ "author": string, "year": string, "title": string, "publisher": string, "url": string, "accessDate": string }],
  "appendices": [{ "title": string, "content": string }]
}"#;

/// Default system prompt for the HTML rendering call.
pub const RENDERING_SYSTEM_PROMPT: &str = r#"You are an academic document formatter. Create an HTML document based on the provided structured content.
The document should follow Harvard academic style guidelines with:

1. A professional, clean layout suitable for academic publishing
2. Proper heading hierarchy and typography
3. Harvard-style citations and references
4. Appropriate spacing, margins, and font choices
5. A table of contents with links to sections
6. Properly formatted footnotes and endnotes if applicable
7. Responsive design that works well for both screen reading and printing

Use semantic HTML5 elements and include CSS styling within a <style> tag in the head.
The styling should be elegant, professional, and appropriate for academic publishing.
Output only the complete HTML code with no markdown formatting or code blocks."#;

/// Build the user message for the structuring call.
///
/// The `ADDITIONAL INSTRUCTIONS` line is present only when `instructions`
/// has visible content.
pub fn structuring_user_message(ocr_text: &str, instructions: Option<&str>) -> String {
    let mut message = format!("OCR TEXT: {ocr_text}\n\n");
    if let Some(extra) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
        message.push_str(&format!("ADDITIONAL INSTRUCTIONS: {extra}\n\n"));
    }
    message.push_str("Please structure this content into a well-organized academic document format.");
    message
}

/// Build the user message for the rendering call from the serialised document.
pub fn rendering_user_message(document_json: &str) -> String {
    format!("STRUCTURED CONTENT: {document_json}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structuring_prompt_names_every_schema_field() {
        for key in [
            "\"title\"",
            "\"abstract\"",
            "\"tableOfContents\"",
            "\"subchapters\"",
            "\"accessDate\"",
            "\"appendices\"",
        ] {
            assert!(STRUCTURING_SYSTEM_PROMPT.contains(key), "missing {key}");
        }
        assert!(STRUCTURING_SYSTEM_PROMPT.contains("Harvard"));
    }

    #[test]
    fn rendering_prompt_forbids_fences() {
        assert!(RENDERING_SYSTEM_PROMPT.contains("no markdown formatting or code blocks"));
        assert!(RENDERING_SYSTEM_PROMPT.contains("<style>"));
    }

    #[test]
    fn user_message_without_instructions() {
        let msg = structuring_user_message("Chapter 1. Intro.", None);
        assert!(msg.starts_with("OCR TEXT: Chapter 1. Intro."));
        assert!(!msg.contains("ADDITIONAL INSTRUCTIONS"));
    }

    #[test]
    fn blank_instructions_are_dropped() {
        let msg = structuring_user_message("text", Some("   "));
        assert!(!msg.contains("ADDITIONAL INSTRUCTIONS"));
    }

    #[test]
    fn instructions_are_embedded() {
        let msg = structuring_user_message("text", Some("Use British spelling"));
        assert!(msg.contains("ADDITIONAL INSTRUCTIONS: Use British spelling"));
    }

    #[test]
    fn rendering_message_embeds_json() {
        assert_eq!(
            rendering_user_message(r#"{"title":"T"}"#),
            r#"STRUCTURED CONTENT: {"title":"T"}"#
        );
    }
}
