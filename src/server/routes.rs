//! Route handlers: the presentation page, the health probe and the two
//! pipeline endpoints the page calls in sequence.

use super::AppState;
use crate::convert;
use actix_web::http::header::{ContentType, CONTENT_DISPOSITION};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Attachment name sent with every PDF.
pub const PDF_FILENAME: &str = "academic-document.pdf";

const INDEX_HTML: &str = include_str!("index.html");

/// Body of `POST /api/resume/html`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub custom_input: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlResponse {
    pub html: String,
}

/// Body of `POST /api/resume/pdf`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PdfRequest {
    #[serde(default)]
    pub html: Option<String>,
}

/// JSON error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

#[get("/")]
pub(super) async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

#[get("/health")]
pub(super) async fn health() -> impl Responder {
    web::Json(serde_json::json!({ "status": "ok" }))
}

#[post("/api/resume/html")]
pub(super) async fn generate_html(
    state: web::Data<AppState>,
    payload: web::Json<HtmlRequest>,
) -> HttpResponse {
    let req = payload.into_inner();
    let content = req.content.unwrap_or_default();
    info!(bytes = content.len(), "HTML generation request received");

    match convert::generate_html(&content, req.custom_input.as_deref(), &state.config).await {
        Ok(output) => {
            if let Some(reason) = output.structuring.fallback_reason() {
                warn!(%reason, "served HTML built from the fallback document");
            }
            info!(bytes = output.html.len(), ms = output.stats.total_ms, "HTML generated");
            HttpResponse::Ok().json(HtmlResponse { html: output.html })
        }
        Err(e) if e.is_client_error() => {
            HttpResponse::BadRequest().json(ErrorBody::new(e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "HTML generation failed");
            HttpResponse::InternalServerError()
                .json(ErrorBody::with_details("Failed to generate HTML", e.to_string()))
        }
    }
}

#[post("/api/resume/pdf")]
pub(super) async fn generate_pdf(
    state: web::Data<AppState>,
    payload: web::Json<PdfRequest>,
) -> HttpResponse {
    let html = payload.into_inner().html.unwrap_or_default();
    info!(bytes = html.len(), "PDF generation request received");

    match convert::generate_pdf(&html, &state.config).await {
        Ok(pdf) => {
            info!(bytes = pdf.len(), "PDF generated");
            HttpResponse::Ok()
                .content_type("application/pdf")
                .insert_header((
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{PDF_FILENAME}\""),
                ))
                .body(pdf)
        }
        Err(e) if e.is_client_error() => {
            HttpResponse::BadRequest().json(ErrorBody::new(e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "PDF generation failed");
            HttpResponse::InternalServerError()
                .json(ErrorBody::with_details("Failed to generate PDF", e.to_string()))
        }
    }
}
