//! # chrome-locate
//!
//! Decide which Chrome/Chromium binary a headless PDF renderer should launch.
//!
//! ## Resolution order
//!
//! 1. An explicit path handed in by the caller (CLI flag, config file).
//! 2. `CHROME_EXECUTABLE_PATH`, then `PUPPETEER_EXECUTABLE_PATH` — the latter
//!    keeps existing Node deployments working without new configuration.
//! 3. Heroku: when `DYNO` is set, the path installed by the
//!    `chrome-for-testing` buildpack.
//! 4. Nothing — the browser library runs its own detection.
//!
//! ```rust
//! use chrome_locate::{resolve_executable, ExecutableSource};
//!
//! let resolved = resolve_executable(None);
//! match resolved.source {
//!     ExecutableSource::LibraryDefault => assert!(resolved.path.is_none()),
//!     _ => assert!(resolved.path.is_some()),
//! }
//! ```
//!
//! ## Environment variables
//!
//! - `CHROME_EXECUTABLE_PATH` — path to a Chrome/Chromium binary.
//! - `PUPPETEER_EXECUTABLE_PATH` — same, honoured for compatibility.
//! - `DYNO` — set by Heroku on every dyno; selects [`HEROKU_CHROME_PATH`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variables checked for an executable override, in order.
pub const EXECUTABLE_ENV_VARS: [&str; 2] = ["CHROME_EXECUTABLE_PATH", "PUPPETEER_EXECUTABLE_PATH"];

/// Environment variable Heroku sets on every dyno.
pub const HEROKU_DYNO_VAR: &str = "DYNO";

/// Binary location used by the Heroku `chrome-for-testing` buildpack.
pub const HEROKU_CHROME_PATH: &str = "/app/.chrome-for-testing/chrome-linux64/chrome";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by [`ResolvedExecutable::verify`].
#[derive(Error, Debug)]
pub enum ChromeLocateError {
    /// The selected path does not exist.
    #[error("Chrome executable not found at '{path}' (selected via {via})")]
    NotFound { path: PathBuf, via: ExecutableSource },

    /// The selected path exists but is a directory or other non-file.
    #[error("Chrome executable path '{path}' is not a file (selected via {via})")]
    NotAFile { path: PathBuf, via: ExecutableSource },
}

// ── Resolution result ────────────────────────────────────────────────────────

/// Where a resolved executable path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableSource {
    /// Supplied by the caller.
    Explicit,
    /// Read from the named environment variable.
    Environment(&'static str),
    /// Heroku deployment path.
    Heroku,
    /// No path chosen; the browser library detects one itself.
    LibraryDefault,
}

impl fmt::Display for ExecutableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutableSource::Explicit => f.write_str("explicit path"),
            ExecutableSource::Environment(var) => write!(f, "${var}"),
            ExecutableSource::Heroku => f.write_str("Heroku deployment path"),
            ExecutableSource::LibraryDefault => f.write_str("library detection"),
        }
    }
}

/// The outcome of executable resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    /// Path to launch, or `None` to defer to the browser library.
    pub path: Option<PathBuf>,
    /// How `path` was chosen.
    pub source: ExecutableSource,
}

impl ResolvedExecutable {
    fn library_default() -> Self {
        Self {
            path: None,
            source: ExecutableSource::LibraryDefault,
        }
    }

    /// Check that a chosen path points at an existing file.
    ///
    /// Always succeeds for [`ExecutableSource::LibraryDefault`]; the library
    /// reports its own detection failures at launch time.
    pub fn verify(&self) -> Result<(), ChromeLocateError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !path.exists() {
            return Err(ChromeLocateError::NotFound {
                path: path.to_path_buf(),
                via: self.source.clone(),
            });
        }
        if !path.is_file() {
            return Err(ChromeLocateError::NotAFile {
                path: path.to_path_buf(),
                via: self.source.clone(),
            });
        }
        Ok(())
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Resolve the executable using the process environment.
pub fn resolve_executable(explicit: Option<&Path>) -> ResolvedExecutable {
    resolve_with(explicit, |var| std::env::var(var).ok())
}

/// Resolve the executable with a caller-supplied environment lookup.
///
/// Empty and whitespace-only values count as unset.
pub fn resolve_with<F>(explicit: Option<&Path>, lookup: F) -> ResolvedExecutable
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return ResolvedExecutable {
            path: Some(path.to_path_buf()),
            source: ExecutableSource::Explicit,
        };
    }

    let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    for var in EXECUTABLE_ENV_VARS {
        if let Some(value) = non_empty(var) {
            return ResolvedExecutable {
                path: Some(PathBuf::from(value.trim())),
                source: ExecutableSource::Environment(var),
            };
        }
    }

    if non_empty(HEROKU_DYNO_VAR).is_some() {
        return ResolvedExecutable {
            path: Some(PathBuf::from(HEROKU_CHROME_PATH)),
            source: ExecutableSource::Heroku,
        };
    }

    ResolvedExecutable::library_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn explicit_path_wins_over_everything() {
        let r = resolve_with(
            Some(Path::new("/opt/chrome")),
            env(&[("CHROME_EXECUTABLE_PATH", "/env/chrome"), ("DYNO", "web.1")]),
        );
        assert_eq!(r.path.as_deref(), Some(Path::new("/opt/chrome")));
        assert_eq!(r.source, ExecutableSource::Explicit);
    }

    #[test]
    fn chrome_var_checked_before_puppeteer_var() {
        let r = resolve_with(
            None,
            env(&[
                ("CHROME_EXECUTABLE_PATH", "/a/chrome"),
                ("PUPPETEER_EXECUTABLE_PATH", "/b/chrome"),
            ]),
        );
        assert_eq!(r.path.as_deref(), Some(Path::new("/a/chrome")));
        assert_eq!(r.source, ExecutableSource::Environment("CHROME_EXECUTABLE_PATH"));
    }

    #[test]
    fn puppeteer_var_beats_heroku() {
        let r = resolve_with(
            None,
            env(&[("PUPPETEER_EXECUTABLE_PATH", "/b/chrome"), ("DYNO", "web.1")]),
        );
        assert_eq!(r.source, ExecutableSource::Environment("PUPPETEER_EXECUTABLE_PATH"));
    }

    #[test]
    fn heroku_dyno_selects_buildpack_path() {
        let r = resolve_with(None, env(&[("DYNO", "web.1")]));
        assert_eq!(r.path.as_deref(), Some(Path::new(HEROKU_CHROME_PATH)));
        assert_eq!(r.source, ExecutableSource::Heroku);
    }

    #[test]
    fn blank_values_are_ignored() {
        let r = resolve_with(None, env(&[("CHROME_EXECUTABLE_PATH", "  "), ("DYNO", "")]));
        assert_eq!(r, ResolvedExecutable::library_default());
    }

    #[test]
    fn library_default_always_verifies() {
        assert!(ResolvedExecutable::library_default().verify().is_ok());
    }

    #[test]
    fn verify_reports_missing_path() {
        let r = resolve_with(Some(Path::new("/definitely/not/chrome")), env(&[]));
        let err = r.verify().unwrap_err();
        assert!(err.to_string().contains("/definitely/not/chrome"));
        assert!(err.to_string().contains("explicit path"));
    }

    #[test]
    fn verify_rejects_directory() {
        let dir = std::env::temp_dir();
        let r = resolve_with(Some(&dir), env(&[]));
        assert!(matches!(r.verify(), Err(ChromeLocateError::NotAFile { .. })));
    }
}
