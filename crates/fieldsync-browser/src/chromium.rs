//! [`PageDriver`] backed by a Chromium instance over the DevTools protocol.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::driver::{BrowserLauncher, PageDriver, PendingDownload};
use crate::error::{BrowserError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after which the network counts as idle.
const NETWORK_QUIET: Duration = Duration::from_millis(500);

/// Hides the usual automation fingerprints from page scripts.
const INIT_SCRIPT: &str = r"
delete Object.getPrototypeOf(navigator).webdriver;
window.chrome = { runtime: {} };
";

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-default-browser-check",
    "--ignore-certificate-errors",
];

impl From<CdpError> for BrowserError {
    fn from(error: CdpError) -> Self {
        BrowserError::Protocol(error.to_string())
    }
}

/// Launches Chromium with a persistent profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn PageDriver>> {
        let driver = ChromiumDriver::launch(config).await?;
        Ok(Box::new(driver))
    }
}

pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumDriver {
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.profile_dir).map_err(|source| BrowserError::Io {
            path: config.profile_dir.clone(),
            source,
        })?;

        let (width, height) = config.viewport;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&config.profile_dir)
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .args(LAUNCH_ARGS.iter().copied())
            .arg(format!("--user-agent={}", config.user_agent));
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    tracing::debug!(error = %error, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(INIT_SCRIPT))
            .await?;

        tracing::info!(
            profile = %config.profile_dir.display(),
            headless = config.headless,
            width,
            height,
            "Browser launched"
        );
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T> {
        self.page
            .evaluate(expression)
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    /// Poll `expression` until it is true or `timeout` passes.
    async fn poll_true(&self, what: &str, expression: String, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(expression.clone()).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::NavigationTimeout {
                    what: what.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// JSON-quote a selector for embedding in a script.
fn js_selector(selector: &str) -> Result<String> {
    serde_json::to_string(selector).map_err(|e| BrowserError::Protocol(e.to_string()))
}

fn visible_js(selector: &str) -> Result<String> {
    Ok(format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
         const style = getComputedStyle(el); const rect = el.getBoundingClientRect(); \
         return style.display !== 'none' && style.visibility !== 'hidden' \
         && rect.width > 0 && rect.height > 0; }})()",
        sel = js_selector(selector)?
    ))
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_network_idle(&self) -> Result<()> {
        const RESOURCES: &str = "performance.getEntriesByType('resource').length";
        let mut last = self.eval::<u64>(RESOURCES.to_string()).await?;
        let mut quiet_since = Instant::now();
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let current = self.eval::<u64>(RESOURCES.to_string()).await?;
            if current != last {
                last = current;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_QUIET {
                return Ok(());
            }
        }
    }

    async fn wait_document_ready(&self) -> Result<()> {
        loop {
            let state = self.eval::<String>("document.readyState".to_string()).await?;
            if state == "complete" {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.poll_true(selector, visible_js(selector)?, timeout).await
    }

    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<()> {
        let hidden = format!("!{}", visible_js(selector)?);
        self.poll_true(selector, hidden, timeout).await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let expression = format!(
            "document.querySelectorAll({}).length",
            js_selector(selector)?
        );
        self.eval::<usize>(expression).await
    }

    async fn is_actionable(&self, selector: &str) -> Result<bool> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return !!el && {visible} && !el.disabled && !el.readOnly; }})()",
            sel = js_selector(selector)?,
            visible = visible_js(selector)?
        );
        self.eval::<bool>(expression).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let clear = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.focus(); el.value = ''; return true; }})()",
            js_selector(selector)?
        );
        if !self.eval::<bool>(clear).await? {
            return Err(BrowserError::ElementNotActionable {
                selector: selector.to_string(),
            });
        }
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn expect_download(&self, dir: &Path) -> Result<PendingDownload> {
        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(BrowserError::Protocol)?;

        let browser = self.browser.lock().await;
        browser.execute(behavior).await?;
        let mut begins = browser.event_listener::<EventDownloadWillBegin>().await?;
        let mut progress = browser.event_listener::<EventDownloadProgress>().await?;
        drop(browser);

        let dir = dir.to_path_buf();
        let completion = async move {
            let begin = begins.next().await.ok_or_else(|| {
                BrowserError::Protocol("download event stream closed".to_string())
            })?;
            tracing::info!(file = %begin.suggested_filename, "Download started");
            while let Some(event) = progress.next().await {
                if event.guid != begin.guid {
                    continue;
                }
                match event.state {
                    DownloadProgressState::Completed => {
                        return save_as_suggested(&dir, &begin.guid, &begin.suggested_filename);
                    }
                    DownloadProgressState::Canceled => {
                        return Err(BrowserError::Protocol("download was cancelled".to_string()));
                    }
                    DownloadProgressState::InProgress => {}
                }
            }
            Err(BrowserError::Protocol(
                "download event stream closed".to_string(),
            ))
        };
        Ok(PendingDownload::new(Box::pin(completion)))
    }

    async fn close(&self) -> Result<()> {
        let page_closed = self.page.clone().close().await;
        let mut browser = self.browser.lock().await;
        let browser_closed = browser.close().await;
        if let Err(error) = browser.wait().await {
            tracing::debug!(error = %error, "Browser process wait failed");
        }
        self.handler.abort();
        page_closed?;
        browser_closed?;
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Downloads land under their GUID; move them to the server's file name.
fn save_as_suggested(dir: &Path, guid: &str, suggested: &str) -> Result<PathBuf> {
    let source = dir.join(guid);
    let name = Path::new(suggested)
        .file_name()
        .map_or_else(|| guid.into(), std::ffi::OsStr::to_os_string);
    let target = dir.join(name);
    std::fs::rename(&source, &target).map_err(|source_err| BrowserError::Io {
        path: source.clone(),
        source: source_err,
    })?;
    Ok(target)
}
