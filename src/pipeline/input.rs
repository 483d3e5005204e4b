//! Input resolution: turn a CLI argument into OCR text.
//!
//! An input is one of:
//! - `-` — read standard input to the end;
//! - an `http://` or `https://` URL — downloaded with `reqwest`;
//! - anything else — a local file path.
//!
//! Every source is read as UTF-8 and checked against the configured size cap
//! before any model call is made.

use crate::error::Notes2PdfError;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the input string means standard input.
pub fn is_stdin(input: &str) -> bool {
    input == "-"
}

/// Reject `text` when it is larger than `max_bytes`.
pub fn check_size(text: &str, max_bytes: usize) -> Result<(), Notes2PdfError> {
    if text.len() > max_bytes {
        return Err(Notes2PdfError::InputTooLarge {
            len: text.len(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Resolve `input` to its text content.
pub async fn resolve_text_input(
    input: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<String, Notes2PdfError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Notes2PdfError::InvalidInput {
            input: input.to_string(),
        });
    }

    let text = if is_stdin(input) {
        read_stdin(max_bytes).await?
    } else if is_url(input) {
        download_text(input, timeout_secs, max_bytes).await?
    } else {
        read_local(input).await?
    };

    check_size(&text, max_bytes)?;
    Ok(text)
}

async fn read_local(path_str: &str) -> Result<String, Notes2PdfError> {
    let path = PathBuf::from(path_str);
    if !path.is_file() {
        return Err(Notes2PdfError::InputNotFound { path });
    }
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| Notes2PdfError::InputReadFailed {
            path: path.clone(),
            source,
        })?;
    debug!("Read {} bytes from {}", text.len(), path.display());
    Ok(text)
}

async fn read_stdin(max_bytes: usize) -> Result<String, Notes2PdfError> {
    let mut buf = Vec::new();
    tokio::io::stdin()
        .take(read_limit(max_bytes))
        .read_to_end(&mut buf)
        .await
        .map_err(|source| Notes2PdfError::InputReadFailed {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
    String::from_utf8(buf).map_err(|e| Notes2PdfError::InputReadFailed {
        path: PathBuf::from("<stdin>"),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })
}

/// Bytes to read from an unsized source: one over the cap is enough to
/// report the overflow.
fn read_limit(max_bytes: usize) -> u64 {
    (max_bytes as u64).saturating_add(1)
}

/// Download a URL and return its body as text.
async fn download_text(
    url: &str,
    timeout_secs: u64,
    max_bytes: usize,
) -> Result<String, Notes2PdfError> {
    info!("Downloading notes from: {}", url);

    let failed = |reason: String| Notes2PdfError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Notes2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes as u64 {
            return Err(Notes2PdfError::InputTooLarge {
                len: len as usize,
                limit: max_bytes,
            });
        }
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            Notes2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    let text = String::from_utf8(bytes.to_vec())
        .map_err(|_| failed("response body is not UTF-8 text".to_string()))?;
    info!("Downloaded {} bytes", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/notes.txt"));
        assert!(is_url("http://example.com/notes.txt"));
        assert!(!is_url("/tmp/notes.txt"));
        assert!(!is_url("notes.txt"));
        assert!(!is_url(""));
    }

    #[test]
    fn read_limit_saturates() {
        assert_eq!(read_limit(1024), 1025);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(read_limit(usize::MAX), u64::MAX);
    }

    #[test]
    fn test_is_stdin() {
        assert!(is_stdin("-"));
        assert!(!is_stdin("--"));
        assert!(!is_stdin("-notes.txt"));
    }

    #[test]
    fn size_check_is_inclusive() {
        assert!(check_size("abcd", 4).is_ok());
        assert!(matches!(
            check_size("abcde", 4),
            Err(Notes2PdfError::InputTooLarge { len: 5, limit: 4 })
        ));
    }

    #[tokio::test]
    async fn reads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Lecture 3: enzymes").unwrap();
        let text = resolve_text_input(file.path().to_str().unwrap(), 5, 1024)
            .await
            .unwrap();
        assert_eq!(text, "Lecture 3: enzymes");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_text_input("/no/such/notes.txt", 5, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, Notes2PdfError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", "x".repeat(64)).unwrap();
        let err = resolve_text_input(file.path().to_str().unwrap(), 5, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, Notes2PdfError::InputTooLarge { len: 64, limit: 16 }));
    }

    #[tokio::test]
    async fn non_utf8_file_is_read_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00]).unwrap();
        let err = resolve_text_input(file.path().to_str().unwrap(), 5, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, Notes2PdfError::InputReadFailed { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_text_input("  ", 5, 1024).await.unwrap_err();
        assert!(matches!(err, Notes2PdfError::InvalidInput { .. }));
    }
}
