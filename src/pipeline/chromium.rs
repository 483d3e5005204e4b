//! Production [`BrowserLauncher`]: headless Chromium via `chromiumoxide`.
//!
//! Each session gets its own throwaway profile directory so concurrent
//! renders never share browser state, and its own DevTools handler task that
//! ends when the browser connection closes.

use crate::config::PdfOptions;
use crate::error::Notes2PdfError;
use crate::pipeline::pdf::{BrowserLauncher, BrowserSession};
use async_trait::async_trait;
use chrome_locate::resolve_executable;
use chromiumoxide::cdp::browser_protocol::page::{EventLifecycleEvent, PrintToPdfParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Flags passed to every launch in addition to chromiumoxide's defaults.
/// The sandbox pair is added separately when [`PdfOptions::disable_sandbox`]
/// is set.
pub const EXTRA_LAUNCH_ARGS: [&str; 2] = ["--disable-dev-shm-usage", "--disable-gpu"];

/// Launches a headless Chromium per render.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        options: &PdfOptions,
    ) -> Result<Box<dyn BrowserSession>, Notes2PdfError> {
        let executable = resolve_executable(options.executable.as_deref());
        executable.verify().map_err(|e| Notes2PdfError::BrowserLaunchFailed {
            detail: e.to_string(),
        })?;
        debug!("Chromium executable: {:?} ({})", executable.path, executable.source);

        let profile = TempDir::new().map_err(|e| Notes2PdfError::BrowserLaunchFailed {
            detail: format!("profile directory: {e}"),
        })?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .launch_timeout(Duration::from_secs(options.timeout_secs))
            .request_timeout(Duration::from_secs(options.timeout_secs))
            .args(EXTRA_LAUNCH_ARGS);
        if options.disable_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = executable.path.as_deref() {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|detail| Notes2PdfError::BrowserLaunchFailed { detail })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            Notes2PdfError::BrowserLaunchFailed {
                detail: e.to_string(),
            }
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler: {}", e);
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page: None,
            handler_task: Some(handler_task),
            _profile: profile,
            closed: false,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    // Removed from disk when the session is dropped.
    _profile: TempDir,
    closed: bool,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn load_html(&mut self, html: &str) -> Result<(), Notes2PdfError> {
        let load_failed = |e: CdpError| Notes2PdfError::PageLoadFailed {
            detail: e.to_string(),
        };
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(load_failed)?;

        // Subscribe before writing so no lifecycle event of the new document
        // is missed.
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(load_failed)?;
        let main_frame = page.mainframe().await.map_err(load_failed)?;

        page.set_content(html).await.map_err(load_failed)?;

        let mut watch = IdleWatch::new(main_frame.map(|f| f.inner().clone()));
        let mut idle = false;
        while let Some(event) = lifecycle.next().await {
            if watch.observe(event.frame_id.inner(), &event.name) {
                idle = true;
                break;
            }
        }
        if !idle {
            return Err(Notes2PdfError::PageLoadFailed {
                detail: "browser disconnected before the network went idle".into(),
            });
        }
        debug!("Page content loaded and network idle");

        self.page = Some(page);
        Ok(())
    }

    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, Notes2PdfError> {
        let page = self.page.as_ref().ok_or_else(|| Notes2PdfError::PdfExportFailed {
            detail: "no page loaded".into(),
        })?;
        page.pdf(print_params(options))
            .await
            .map_err(|e| Notes2PdfError::PdfExportFailed {
                detail: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), Notes2PdfError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.page = None;

        let closed = self.browser.close().await;
        if closed.is_err() {
            // The DevTools connection is gone; make sure the process is too.
            if let Some(Err(e)) = self.browser.kill().await {
                warn!("Failed to kill browser process: {}", e);
            }
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        closed
            .map(|_| ())
            .map_err(|e| Notes2PdfError::Internal(format!("browser close: {e}")))
    }
}

/// Tracks main-frame lifecycle events until the written document has loaded
/// and its network has gone idle.
///
/// Events from other frames are ignored, and a `networkIdle` left over from
/// `about:blank` does not count because it arrives before the new document's
/// `DOMContentLoaded`/`load`.
#[derive(Debug, Default)]
struct IdleWatch {
    main_frame: Option<String>,
    document_ready: bool,
}

impl IdleWatch {
    fn new(main_frame: Option<String>) -> Self {
        Self {
            main_frame,
            document_ready: false,
        }
    }

    /// Feed one lifecycle event; true once the page is idle.
    fn observe(&mut self, frame_id: &str, name: &str) -> bool {
        if self.main_frame.as_deref().is_some_and(|f| f != frame_id) {
            return false;
        }
        match name {
            "init" => {
                self.document_ready = false;
                false
            }
            "DOMContentLoaded" | "load" => {
                self.document_ready = true;
                false
            }
            "networkIdle" => self.document_ready,
            _ => false,
        }
    }
}

/// DevTools print parameters for `options`.
pub fn print_params(options: &PdfOptions) -> PrintToPdfParams {
    let (width, height) = options.paper.dimensions_in();
    let margin = options.margin_inches;
    PrintToPdfParams {
        print_background: Some(options.print_background),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(margin),
        margin_bottom: Some(margin),
        margin_left: Some(margin),
        margin_right: Some(margin),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaperSize;

    #[test]
    fn a4_print_params() {
        let params = print_params(&PdfOptions::default());
        assert_eq!(params.paper_width, Some(8.27));
        assert_eq!(params.paper_height, Some(11.69));
        assert_eq!(params.margin_top, Some(1.0));
        assert_eq!(params.margin_left, Some(1.0));
        assert_eq!(params.print_background, Some(true));
    }

    #[test]
    fn custom_paper_and_margins() {
        let options = PdfOptions {
            paper: PaperSize::Letter,
            margin_inches: 0.5,
            print_background: false,
            ..PdfOptions::default()
        };
        let params = print_params(&options);
        assert_eq!(params.paper_width, Some(8.5));
        assert_eq!(params.margin_bottom, Some(0.5));
        assert_eq!(params.print_background, Some(false));
    }

    #[tokio::test]
    async fn missing_explicit_executable_fails_before_launch() {
        let options = PdfOptions {
            executable: Some("/nonexistent/chrome-binary".into()),
            ..PdfOptions::default()
        };
        let err = ChromiumLauncher::new().launch(&options).await.err().unwrap();
        assert!(matches!(
            err,
            Notes2PdfError::BrowserLaunchFailed { ref detail }
                if detail.contains("/nonexistent/chrome-binary")
        ));
    }

    #[test]
    fn idle_requires_the_written_document_to_load_first() {
        let mut watch = IdleWatch::new(Some("main".into()));
        // Left over from about:blank.
        assert!(!watch.observe("main", "networkIdle"));
        assert!(!watch.observe("main", "DOMContentLoaded"));
        assert!(!watch.observe("main", "networkAlmostIdle"));
        assert!(watch.observe("main", "networkIdle"));
    }

    #[test]
    fn idle_ignores_other_frames() {
        let mut watch = IdleWatch::new(Some("main".into()));
        assert!(!watch.observe("iframe", "load"));
        assert!(!watch.observe("iframe", "networkIdle"));
        assert!(!watch.observe("main", "networkIdle"));
        assert!(!watch.observe("main", "load"));
        assert!(watch.observe("main", "networkIdle"));
    }

    #[test]
    fn idle_resets_on_new_document() {
        let mut watch = IdleWatch::new(None);
        assert!(!watch.observe("any", "load"));
        assert!(!watch.observe("any", "init"));
        assert!(!watch.observe("any", "networkIdle"));
        assert!(!watch.observe("any", "load"));
        assert!(watch.observe("any", "networkIdle"));
    }
}
