//! Error types for the browser workflow.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser engine could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// A page or element did not become ready in time.
    #[error("timed out after {}s waiting for {what}", timeout.as_secs_f32())]
    NavigationTimeout { what: String, timeout: Duration },

    /// An element exists but cannot be interacted with.
    #[error("element '{selector}' is not actionable")]
    ElementNotActionable { selector: String },

    #[error("download did not complete within {}s", timeout.as_secs_f32())]
    DownloadTimeout { timeout: Duration },

    /// The captured file is empty or unreadable.
    #[error("invalid download {}: {reason}", path.display())]
    DownloadInvalid { path: PathBuf, reason: String },

    /// DevTools protocol or script evaluation failure.
    #[error("browser protocol error: {0}")]
    Protocol(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was interrupted before it finished.
    #[error("workflow cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BrowserError>;
