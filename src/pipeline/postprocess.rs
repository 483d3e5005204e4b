//! Post-processing: deterministic cleanup of model answers.
//!
//! Models disobey "no markdown fences" often enough that both stages clean
//! their output here instead of trusting the prompt:
//!
//! - the structuring answer is reduced to the text most likely to be the
//!   JSON object ([`extract_json_block`]);
//! - the rendering answer has every fence marker removed
//!   ([`strip_code_fences`]).
//!
//! Each rule is a pure `&str → String` function, independently testable.

use once_cell::sync::Lazy;
use regex::Regex;

// ── JSON extraction ──────────────────────────────────────────────────────────

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Pick the substring of a model answer that should hold the JSON object.
///
/// 1. If the answer contains a ```` ```json ```` marker, the text after the
///    first such marker up to the next ```` ``` ```` (or the end).
/// 2. Else, if it contains a ```` ``` ```` fence, the body of the first fenced
///    block; a language tag on the opening line is skipped.
/// 3. Else the whole answer.
///
/// The result is trimmed. No JSON validation happens here.
pub fn extract_json_block(answer: &str) -> String {
    if let Some(start) = answer.find(JSON_FENCE) {
        let rest = &answer[start + JSON_FENCE.len()..];
        return until_fence(rest).trim().to_string();
    }

    if let Some(start) = answer.find(FENCE) {
        let rest = &answer[start + FENCE.len()..];
        let body = skip_language_tag(rest);
        return until_fence(body).trim().to_string();
    }

    answer.trim().to_string()
}

fn until_fence(s: &str) -> &str {
    match s.find(FENCE) {
        Some(end) => &s[..end],
        None => s,
    }
}

/// Drop a bare word (`JSON`, `javascript`, …) between the opening fence and
/// the first newline. Anything else on that line is kept as content.
fn skip_language_tag(s: &str) -> &str {
    match s.find('\n') {
        Some(nl) => {
            let tag = s[..nl].trim();
            if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                &s[nl + 1..]
            } else {
                s
            }
        }
        None => s,
    }
}

// ── Fence stripping ──────────────────────────────────────────────────────────

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:html|xhtml|xml)?").unwrap());

/// Remove every ```` ``` ```` marker, with an optional `html`/`xml`/`xhtml`
/// tag, from anywhere in the text, then trim.
pub fn strip_code_fences(input: &str) -> String {
    let s = normalise_line_endings(input);
    RE_CODE_FENCE.replace_all(&s, "").trim().to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n")
}

// ── Inspection ───────────────────────────────────────────────────────────────

static RE_SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script\b").unwrap());

/// `true` when the markup contains a `<script` element.
pub fn contains_script(html: &str) -> bool {
    RE_SCRIPT_TAG.is_match(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fence_preferred() {
        let answer = "Here you go:\n```json\n{\"title\":\"T\"}\n```\nThanks";
        assert_eq!(extract_json_block(answer), "{\"title\":\"T\"}");
    }

    #[test]
    fn json_fence_without_closing_marker() {
        let answer = "```json\n{\"title\":\"T\"}";
        assert_eq!(extract_json_block(answer), "{\"title\":\"T\"}");
    }

    #[test]
    fn json_fence_wins_over_earlier_plain_fence() {
        let answer = "```\nnot this\n```\n```json\n{\"a\":1}\n```";
        assert_eq!(extract_json_block(answer), "{\"a\":1}");
    }

    #[test]
    fn plain_fence_skips_language_tag() {
        let answer = "```JSON\n{\"title\":\"T\"}\n```";
        assert_eq!(extract_json_block(answer), "{\"title\":\"T\"}");
        let answer = "```\n{\"title\":\"T\"}\n```";
        assert_eq!(extract_json_block(answer), "{\"title\":\"T\"}");
    }

    #[test]
    fn single_line_fence_kept_as_content() {
        let answer = "``` {\"a\": 1} ```";
        assert_eq!(extract_json_block(answer), "{\"a\": 1}");
    }

    #[test]
    fn bare_answer_is_trimmed() {
        assert_eq!(extract_json_block("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(extract_json_block("no json here"), "no json here");
    }

    #[test]
    fn strip_fences_removes_wrapper() {
        let answer = "```html\n<!DOCTYPE html><html><body>x</body></html>\n```";
        assert_eq!(
            strip_code_fences(answer),
            "<!DOCTYPE html><html><body>x</body></html>"
        );
    }

    #[test]
    fn strip_fences_is_case_insensitive_and_global() {
        let answer = "```HTML\n<p>a</p>\n```\n```xml\n<p>b</p>\n```";
        assert_eq!(strip_code_fences(answer), "<p>a</p>\n\n\n<p>b</p>");
    }

    #[test]
    fn strip_fences_leaves_plain_html() {
        let html = "<html><body><pre>code</pre></body></html>";
        assert_eq!(strip_code_fences(html), html);
    }

    #[test]
    fn strip_fences_handles_crlf() {
        assert_eq!(strip_code_fences("```html\r\n<p>x</p>\r\n```"), "<p>x</p>");
    }

    #[test]
    fn strip_fences_of_only_fences_is_empty() {
        assert_eq!(strip_code_fences("```html\n\n```"), "");
    }

    #[test]
    fn script_detection() {
        assert!(contains_script("<body><SCRIPT src=x></SCRIPT></body>"));
        assert!(contains_script("<script>alert(1)</script>"));
        assert!(!contains_script("<p>no scripts; <scripture> is fine</p>"));
    }
}
