//! HTTP API and presentation page (feature `server`).
//!
//! | Method | Path                | Body                    | Success                  |
//! |--------|---------------------|-------------------------|--------------------------|
//! | GET    | `/`                 |                         | presentation page        |
//! | GET    | `/health`           |                         | `{"status":"ok"}`        |
//! | POST   | `/api/resume/html`  | `{content, customInput}`| `{html}`                 |
//! | POST   | `/api/resume/pdf`   | `{html}`                | `application/pdf` bytes  |
//!
//! Errors are JSON: `{error}` for 400, `{error, details}` for 500.
//!
//! Every worker shares one [`AppState`]; requests hold no other shared state.

mod routes;

use crate::config::PipelineConfig;
use crate::convert::with_resolved_backends;
use crate::error::Notes2PdfError;
use actix_web::{error, middleware, web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub use routes::{ErrorBody, HtmlRequest, HtmlResponse, PdfRequest, PDF_FILENAME};

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Shared, immutable per-server state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PipelineConfig>,
}

impl AppState {
    /// Resolve the model backend and browser launcher once, up front.
    pub fn new(config: &PipelineConfig) -> Result<Self, Notes2PdfError> {
        Ok(Self {
            config: Arc::new(with_resolved_backends(config)?),
        })
    }
}

/// Listen settings for [`run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOptions {
    pub bind: String,
    /// Worker threads. None uses actix-web's default (one per core).
    pub workers: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            workers: None,
        }
    }
}

/// Register routes, shared state and the JSON extractor settings.
pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<AppState>) {
    let limit = json_body_limit(state.config.max_input_bytes);
    cfg.app_data(state)
        .app_data(json_config(limit))
        .service(routes::index)
        .service(routes::health)
        .service(routes::generate_html)
        .service(routes::generate_pdf);
}

/// JSON escaping can double the size of text, so the body limit leaves room
/// for it; the exact text limit is enforced after parsing.
pub fn json_body_limit(max_input_bytes: usize) -> usize {
    max_input_bytes.saturating_mul(2).saturating_add(4096)
}

fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .content_type_required(false)
        .error_handler(|err, _req| {
            let body = ErrorBody::with_details("Invalid JSON body", err.to_string());
            let response = HttpResponse::BadRequest().json(body);
            error::InternalError::from_response(err, response).into()
        })
}

/// Serve until the process is stopped.
pub async fn run(state: AppState, options: &ServerOptions) -> std::io::Result<()> {
    let data = web::Data::new(state);
    info!("notes2pdf listening on http://{}", options.bind);

    let server = HttpServer::new(move || {
        let data = data.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(move |cfg| configure(cfg, data))
    })
    .bind(options.bind.as_str())?;

    let server = match options.workers {
        Some(n) => server.workers(n.max(1)),
        None => server,
    };
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_leaves_room_for_escaping() {
        assert_eq!(json_body_limit(1000), 6096);
        assert_eq!(json_body_limit(usize::MAX), usize::MAX);
    }

    #[test]
    fn default_options() {
        let o = ServerOptions::default();
        assert_eq!(o.bind, "127.0.0.1:3000");
        assert!(o.workers.is_none());
    }
}
