//! PDF stage: HTML → PDF bytes through a headless browser.
//!
//! ## Browser lifetime
//!
//! Every call launches its own browser and closes it before returning. Once
//! [`BrowserLauncher::launch`] has succeeded, [`BrowserSession::close`] runs
//! exactly once whatever happens while loading or printing:
//!
//! | load/print | close  | result                               |
//! |------------|--------|--------------------------------------|
//! | ok         | ok     | `Ok(pdf)`                            |
//! | ok         | failed | `Ok(pdf)`, close failure logged      |
//! | failed     | any    | the load/print error, close logged   |
//!
//! Each step (launch, load, print, close) is bounded by
//! [`PdfOptions::timeout_secs`].

use crate::config::PdfOptions;
use crate::error::Notes2PdfError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Starts a browser for one PDF render.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &PdfOptions) -> Result<Box<dyn BrowserSession>, Notes2PdfError>;
}

/// A running browser with (at most) one page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a page, load `html` into it and wait until network activity is
    /// idle.
    async fn load_html(&mut self, html: &str) -> Result<(), Notes2PdfError>;

    /// Print the loaded page.
    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, Notes2PdfError>;

    /// Shut the browser down. Must tolerate being called after a failed step.
    async fn close(&mut self) -> Result<(), Notes2PdfError>;
}

/// Render `html` to PDF bytes with a freshly launched browser.
pub async fn render_pdf(
    launcher: &dyn BrowserLauncher,
    html: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>, Notes2PdfError> {
    let start = Instant::now();
    let limit = Duration::from_secs(options.timeout_secs);

    let mut session =
        bounded(limit, options.timeout_secs, "launch", launcher.launch(options)).await?;
    debug!("Browser launched in {:?}", start.elapsed());

    let printed = load_and_print(session.as_mut(), html, options, limit).await;

    match bounded(limit, options.timeout_secs, "close", session.close()).await {
        Ok(()) => debug!("Browser closed"),
        Err(e) => warn!("Failed to close browser cleanly: {}", e),
    }

    let pdf = printed?;
    info!("Rendered PDF: {} bytes in {:?}", pdf.len(), start.elapsed());
    Ok(pdf)
}

async fn load_and_print(
    session: &mut dyn BrowserSession,
    html: &str,
    options: &PdfOptions,
    limit: Duration,
) -> Result<Vec<u8>, Notes2PdfError> {
    bounded(limit, options.timeout_secs, "page load", session.load_html(html)).await?;
    bounded(limit, options.timeout_secs, "print", session.print_pdf(options)).await
}

async fn bounded<T, F>(
    limit: Duration,
    secs: u64,
    stage: &'static str,
    step: F,
) -> Result<T, Notes2PdfError>
where
    F: Future<Output = Result<T, Notes2PdfError>>,
{
    timeout(limit, step)
        .await
        .map_err(|_| Notes2PdfError::BrowserTimeout { stage, secs })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLauncher, FakeStep};

    const HTML: &str = "<html><body><h1>Notes</h1></body></html>";

    #[tokio::test]
    async fn success_closes_once() {
        let launcher = FakeLauncher::new();
        let pdf = render_pdf(&launcher, HTML, &PdfOptions::default()).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.closes(), 1);
        assert_eq!(launcher.loaded_html(), vec![HTML.to_string()]);
    }

    #[tokio::test]
    async fn load_failure_still_closes_once() {
        let launcher = FakeLauncher::new().failing_at(FakeStep::Load);
        let err = render_pdf(&launcher, HTML, &PdfOptions::default()).await.unwrap_err();
        assert!(matches!(err, Notes2PdfError::PageLoadFailed { .. }));
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn print_failure_still_closes_once() {
        let launcher = FakeLauncher::new().failing_at(FakeStep::Print);
        let err = render_pdf(&launcher, HTML, &PdfOptions::default()).await.unwrap_err();
        assert!(matches!(err, Notes2PdfError::PdfExportFailed { .. }));
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn close_failure_after_print_keeps_pdf() {
        let launcher = FakeLauncher::new().failing_at(FakeStep::Close);
        let pdf = render_pdf(&launcher, HTML, &PdfOptions::default()).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(launcher.closes(), 1);
    }

    #[tokio::test]
    async fn launch_failure_never_closes() {
        let launcher = FakeLauncher::new().failing_at(FakeStep::Launch);
        let err = render_pdf(&launcher, HTML, &PdfOptions::default()).await.unwrap_err();
        assert!(matches!(err, Notes2PdfError::BrowserLaunchFailed { .. }));
        assert_eq!(launcher.closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_load_times_out_and_closes() {
        let launcher = FakeLauncher::new().hanging_at(FakeStep::Load);
        let options = PdfOptions {
            timeout_secs: 2,
            ..PdfOptions::default()
        };
        let err = render_pdf(&launcher, HTML, &options).await.unwrap_err();
        assert!(matches!(
            err,
            Notes2PdfError::BrowserTimeout { stage: "page load", secs: 2 }
        ));
        assert_eq!(launcher.closes(), 1);
    }
}
