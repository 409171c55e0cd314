//! In-memory [`PageDriver`] with scripted timings for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::driver::{BrowserLauncher, PageDriver, PendingDownload};
use crate::error::{BrowserError, Result};

/// How a scripted condition resolves.
#[derive(Debug, Clone)]
pub enum Behavior {
    Ready,
    After(Duration),
    Never,
    Fail,
}

impl Behavior {
    async fn run(&self) -> Result<()> {
        match self {
            Behavior::Ready => Ok(()),
            Behavior::After(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Behavior::Never => futures::future::pending().await,
            Behavior::Fail => Err(BrowserError::Protocol("scripted failure".into())),
        }
    }

    async fn run_bounded(&self, what: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.run()).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                what: what.to_string(),
                timeout,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadScript {
    /// Write these bytes under this file name after the delay.
    Completes { name: String, bytes: Vec<u8>, after: Duration },
    Never,
}

/// Records every action so tests can assert on ordering.
pub type ActionLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    network_idle: Behavior,
    document_ready: Behavior,
    visible: HashMap<String, Behavior>,
    hidden: HashMap<String, Behavior>,
    present: HashSet<String>,
    not_actionable: HashSet<String>,
    failing_close: bool,
    download: DownloadScript,
    log: ActionLog,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            network_idle: Behavior::Ready,
            document_ready: Behavior::Ready,
            visible: HashMap::new(),
            hidden: HashMap::new(),
            present: HashSet::new(),
            not_actionable: HashSet::new(),
            failing_close: false,
            download: DownloadScript::Never,
            log: Arc::default(),
        }
    }

    pub fn network_idle(mut self, behavior: Behavior) -> Self {
        self.network_idle = behavior;
        self
    }

    pub fn document_ready(mut self, behavior: Behavior) -> Self {
        self.document_ready = behavior;
        self
    }

    pub fn visible(mut self, selector: &str, behavior: Behavior) -> Self {
        self.visible.insert(selector.to_string(), behavior);
        self
    }

    pub fn hidden(mut self, selector: &str, behavior: Behavior) -> Self {
        self.hidden.insert(selector.to_string(), behavior);
        self
    }

    pub fn present(mut self, selector: &str) -> Self {
        self.present.insert(selector.to_string());
        self
    }

    pub fn not_actionable(mut self, selector: &str) -> Self {
        self.not_actionable.insert(selector.to_string());
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    pub fn download(mut self, script: DownloadScript) -> Self {
        self.download = script;
        self
    }

    pub fn log(&self) -> ActionLog {
        Arc::clone(&self.log)
    }

    fn record(&self, action: String) {
        if let Ok(mut log) = self.log.lock() {
            log.push(action);
        }
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.record(format!("goto {url}"));
        Ok(())
    }

    async fn wait_network_idle(&self) -> Result<()> {
        self.network_idle.run().await
    }

    async fn wait_document_ready(&self) -> Result<()> {
        self.document_ready.run().await
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let behavior = self.visible.get(selector).cloned().unwrap_or(Behavior::Ready);
        behavior.run_bounded(selector, timeout).await
    }

    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<()> {
        let behavior = self.hidden.get(selector).cloned().unwrap_or(Behavior::Ready);
        behavior.run_bounded(selector, timeout).await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        Ok(usize::from(self.present.contains(selector)))
    }

    async fn is_actionable(&self, selector: &str) -> Result<bool> {
        Ok(!self.not_actionable.contains(selector))
    }

    async fn fill(&self, selector: &str, _value: &str) -> Result<()> {
        self.record(format!("fill {selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn expect_download(&self, dir: &Path) -> Result<PendingDownload> {
        self.record("expect download".to_string());
        let dir = dir.to_path_buf();
        let script = self.download.clone();
        let completion = async move {
            match script {
                DownloadScript::Completes { name, bytes, after } => {
                    scripted_download(dir.join(name), bytes, after).await
                }
                DownloadScript::Never => futures::future::pending::<Result<PathBuf>>().await,
            }
        };
        Ok(PendingDownload::new(Box::pin(completion)))
    }

    async fn close(&self) -> Result<()> {
        self.record("close".to_string());
        if self.failing_close {
            return Err(BrowserError::Protocol("already closed".into()));
        }
        Ok(())
    }
}

async fn scripted_download(path: PathBuf, bytes: Vec<u8>, after: Duration) -> Result<PathBuf> {
    tokio::time::sleep(after).await;
    std::fs::write(&path, bytes).map_err(|source| BrowserError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Hands out one prepared [`ScriptedDriver`], or fails to launch.
pub struct ScriptedLauncher {
    driver: Mutex<Option<ScriptedDriver>>,
}

impl ScriptedLauncher {
    pub fn new(driver: ScriptedDriver) -> Self {
        Self {
            driver: Mutex::new(Some(driver)),
        }
    }

    pub fn broken() -> Self {
        Self {
            driver: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn PageDriver>> {
        let driver = self.driver.lock().ok().and_then(|mut slot| slot.take());
        match driver {
            Some(driver) => Ok(Box::new(driver)),
            None => Err(BrowserError::Launch("no browser available".into())),
        }
    }
}
