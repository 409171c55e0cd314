//! The seam between the workflow and a concrete browser engine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::config::SessionConfig;
use crate::error::Result;

/// Operations the workflow needs from one page.
///
/// Waits without a `timeout` argument resolve whenever their condition
/// holds; callers bound them. Waits with a `timeout` fail with
/// [`BrowserError::NavigationTimeout`](crate::BrowserError::NavigationTimeout).
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Resolves once no new network activity has been seen for a short quiet period.
    async fn wait_network_idle(&self) -> Result<()>;

    /// Resolves once `document.readyState` is `complete`.
    async fn wait_document_ready(&self) -> Result<()>;

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of elements matching `selector`, visible or not.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Visible, enabled and editable.
    async fn is_actionable(&self, selector: &str) -> Result<bool>;

    /// Replace the element's value with `value`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// Start listening for the next download, saving it into `dir`.
    ///
    /// Must be called before the action that triggers the download.
    async fn expect_download(&self, dir: &Path) -> Result<PendingDownload>;

    /// Close the page's context and stop the engine.
    async fn close(&self) -> Result<()>;
}

/// Starts a browser and hands back its single page.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn PageDriver>>;
}

/// A download being listened for.
///
/// Resolves to the saved file's path, named after the server's suggestion.
pub struct PendingDownload {
    completion: BoxFuture<'static, Result<PathBuf>>,
}

impl PendingDownload {
    pub fn new(completion: BoxFuture<'static, Result<PathBuf>>) -> Self {
        Self { completion }
    }

    pub async fn finish(self) -> Result<PathBuf> {
        self.completion.await
    }
}

impl fmt::Debug for PendingDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDownload").finish_non_exhaustive()
    }
}
