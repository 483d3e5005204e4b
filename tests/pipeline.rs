//! Offline integration tests for the full pipeline.
//!
//! The model and the browser are replaced by `ScriptedBackend` and
//! `FakeLauncher`, so these run anywhere, in parallel, without API keys.

use notes2pdf::document::{FALLBACK_ABSTRACT, FALLBACK_AUTHOR, FALLBACK_TITLE};
use notes2pdf::testing::{FakeLauncher, FakeStep, ScriptedBackend, FAKE_PDF};
use notes2pdf::{
    convert, convert_sync, convert_to_files, generate_html, structure, Notes2PdfError,
    PipelineConfig, PipelineProgressCallback, Stage, StructuringError,
};
use std::sync::{Arc, Mutex};

const NOTES: &str = "Lecture 3 - Membrane transport\n\
passive vs active transport, Na/K pump uses ATP\n\
ref: Alberts et al 2015 Molecular Biology of the Cell";

const STRUCTURED: &str = r#"{
  "title": "Membrane Transport",
  "author": "Unknown Author",
  "abstract": "Notes on passive and active transport.",
  "tableOfContents": ["Passive transport", "Active transport"],
  "chapters": [
    {"title": "Passive transport", "content": "Diffusion down a gradient."},
    {"title": "Active transport", "content": "The Na/K pump uses ATP.",
     "subchapters": [{"title": "Pumps", "content": "P-type ATPases."}]}
  ],
  "references": [
    {"author": "Alberts, B. et al.", "year": "2015",
     "title": "Molecular Biology of the Cell", "publisher": "Garland Science"}
  ]
}"#;

const HTML: &str = "<!DOCTYPE html><html><body><h1>Membrane Transport</h1></body></html>";

fn config(backend: &Arc<ScriptedBackend>, launcher: &Arc<FakeLauncher>) -> PipelineConfig {
    PipelineConfig::builder()
        .backend(backend.clone())
        .launcher(launcher.clone())
        .build()
        .expect("valid config")
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_runs_all_three_stages() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_response(format!("```html\n{HTML}\n```")),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let output = convert(NOTES, Some("Use British spelling"), &config(&backend, &launcher))
        .await
        .expect("conversion should succeed");

    assert_eq!(output.pdf, FAKE_PDF);
    assert_eq!(output.html, HTML, "fences must be stripped");
    assert_eq!(output.document().title.as_deref(), Some("Membrane Transport"));
    assert_eq!(output.stats.chapters, 2);
    assert_eq!(output.stats.references, 1);
    assert!(!output.stats.used_fallback);

    // Exactly two model calls; the second carries the structured JSON.
    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].0.user.starts_with(&format!("OCR TEXT: {NOTES}")));
    assert!(calls[0].0.user.contains("ADDITIONAL INSTRUCTIONS: Use British spelling"));
    assert!(calls[1].0.user.starts_with("STRUCTURED CONTENT: {"));
    assert!(calls[1].0.user.contains("\"tableOfContents\""));
    assert!((calls[0].1.temperature - 0.2).abs() < f32::EPSILON);

    // One browser, loaded with the final HTML, closed once.
    assert_eq!(launcher.launches(), 1);
    assert_eq!(launcher.closes(), 1);
    assert_eq!(launcher.loaded_html(), vec![HTML.to_string()]);
}

#[tokio::test]
async fn test_fenced_json_with_commentary_is_parsed() {
    let answer =
        format!("Here is the structure you asked for:\n```json\n{STRUCTURED}\n```\nHope it helps!");
    let backend = Arc::new(ScriptedBackend::new().with_response(answer));
    let launcher = Arc::new(FakeLauncher::new());

    let outcome = structure(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap();

    assert!(!outcome.is_fallback());
    assert_eq!(outcome.document().chapter_count(), 2);
    // Blank instructions are dropped from the prompt.
    assert!(!backend.calls()[0].0.user.contains("ADDITIONAL INSTRUCTIONS"));
}

// ── Fallback ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_prose_answer_falls_back_and_still_renders() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response("Sorry, I cannot structure this text.")
            .with_response(HTML),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let output = convert(NOTES, None, &config(&backend, &launcher)).await.unwrap();

    assert_eq!(output.fallback_reason(), Some(&StructuringError::NoJsonObject));
    let doc = output.document();
    assert_eq!(doc.title.as_deref(), Some(FALLBACK_TITLE));
    assert_eq!(doc.author.as_deref(), Some(FALLBACK_AUTHOR));
    assert_eq!(doc.abstract_text.as_deref(), Some(FALLBACK_ABSTRACT));
    let chapters = doc.chapters.as_ref().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].content.as_deref(), Some(NOTES));
    assert!(output.stats.used_fallback);
    assert!(output.pdf.starts_with(b"%PDF"));

    // The rendering prompt received the fallback document.
    assert!(backend.calls()[1].0.user.contains(FALLBACK_TITLE));
}

#[tokio::test]
async fn test_structuring_model_error_falls_back() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_error("429 rate limited")
            .with_response(HTML),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let html = generate_html(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap();

    assert!(matches!(
        html.structuring.fallback_reason(),
        Some(StructuringError::ModelCallFailed(msg)) if msg.contains("429")
    ));
    assert_eq!(html.html, HTML);
}

#[tokio::test]
async fn test_json_array_answer_falls_back() {
    let backend = Arc::new(ScriptedBackend::new().with_response("[1, 2, 3]"));
    let launcher = Arc::new(FakeLauncher::new());

    let outcome = structure(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap();

    assert!(matches!(
        outcome.fallback_reason(),
        Some(StructuringError::SchemaViolation(_))
    ));
}

// ── Fatal failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rendering_model_error_is_fatal() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_error("upstream unavailable"),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let err = convert(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap_err();

    assert!(matches!(err, Notes2PdfError::LlmApiError { .. }));
    assert!(!err.is_client_error());
    assert_eq!(launcher.launches(), 0, "no browser without HTML");
}

#[tokio::test]
async fn test_fence_only_html_is_empty() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_response("```html\n```"),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let err = convert(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap_err();
    assert!(matches!(err, Notes2PdfError::EmptyHtml));
}

#[tokio::test]
async fn test_print_failure_still_closes_browser() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_response(HTML),
    );
    let launcher = Arc::new(FakeLauncher::new().failing_at(FakeStep::Print));

    let err = convert(NOTES, None, &config(&backend, &launcher))
        .await
        .unwrap_err();

    assert!(matches!(err, Notes2PdfError::PdfExportFailed { .. }));
    assert_eq!(launcher.launches(), 1);
    assert_eq!(launcher.closes(), 1);
}

#[tokio::test]
async fn test_oversized_input_never_reaches_the_model() {
    let backend = Arc::new(ScriptedBackend::new().with_response(STRUCTURED));
    let launcher = Arc::new(FakeLauncher::new());
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .launcher(launcher.clone())
        .max_input_bytes(16)
        .build()
        .unwrap();

    let err = convert(NOTES, None, &config).await.unwrap_err();

    assert!(err.is_client_error());
    assert!(matches!(err, Notes2PdfError::InputTooLarge { limit: 16, .. }));
    assert_eq!(backend.call_count(), 0);
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl PipelineProgressCallback for Recorder {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start {stage}"));
    }
    fn on_stage_complete(&self, stage: Stage, _output_len: usize) {
        self.events.lock().unwrap().push(format!("done {stage}"));
    }
    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.events.lock().unwrap().push(format!("error {stage}"));
    }
    fn on_fallback(&self, _reason: &StructuringError) {
        self.events.lock().unwrap().push("fallback".to_string());
    }
}

#[tokio::test]
async fn test_progress_events_arrive_in_order() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response("no json here")
            .with_response(HTML),
    );
    let recorder = Arc::new(Recorder::default());
    let config = PipelineConfig::builder()
        .backend(backend)
        .launcher(Arc::new(FakeLauncher::new().failing_at(FakeStep::Load)))
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    assert!(convert(NOTES, None, &config).await.is_err());

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            "start structuring",
            "fallback",
            "done structuring",
            "start HTML rendering",
            "done HTML rendering",
            "start PDF rendering",
            "error PDF rendering",
        ]
    );
}

// ── Files and sync entry points ──────────────────────────────────────────────

#[tokio::test]
async fn test_convert_to_files_writes_pdf_and_html() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_response(HTML),
    );
    let launcher = Arc::new(FakeLauncher::new());
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("out/notes.pdf");
    let html_path = dir.path().join("out/notes.html");

    let stats = convert_to_files(
        NOTES,
        None,
        &pdf_path,
        Some(html_path.as_path()),
        &config(&backend, &launcher),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&pdf_path).unwrap(), FAKE_PDF);
    assert_eq!(std::fs::read_to_string(&html_path).unwrap(), HTML);
    assert_eq!(stats.pdf_bytes, FAKE_PDF.len());
    assert!(!dir.path().join("out/notes.pdf.tmp").exists());
}

#[test]
fn test_convert_sync_outside_a_runtime() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_response(STRUCTURED)
            .with_response(HTML),
    );
    let launcher = Arc::new(FakeLauncher::new());

    let output = convert_sync(NOTES, None, &config(&backend, &launcher)).unwrap();
    assert!(output.pdf.starts_with(b"%PDF"));
}

#[test]
fn test_structure_with_block_on() {
    let backend = Arc::new(ScriptedBackend::new().with_response(STRUCTURED));
    let launcher = Arc::new(FakeLauncher::new());
    let config = config(&backend, &launcher);

    let outcome = tokio_test::block_on(structure(NOTES, None, &config)).unwrap();
    assert_eq!(outcome.document().reference_count(), 1);
}
