//! The login → export → download workflow as an explicit state machine.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::Instrument;

use crate::config::{Credentials, SessionConfig};
use crate::driver::{BrowserLauncher, PageDriver};
use crate::error::{BrowserError, Result};
use crate::validator::validate_download;
use crate::wait::{PageWait, wait_for_loader, wait_for_page};

/// Result of validating the captured download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Success,
    Rejected,
}

/// Where the session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    BrowserReady,
    LoginPageLoaded,
    Authenticated,
    TargetViewLoaded,
    ExportTriggered,
    DownloadCaptured,
    Validated(Validation),
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unstarted => "unstarted",
            SessionState::BrowserReady => "browser ready",
            SessionState::LoginPageLoaded => "login page loaded",
            SessionState::Authenticated => "authenticated",
            SessionState::TargetViewLoaded => "target view loaded",
            SessionState::ExportTriggered => "export triggered",
            SessionState::DownloadCaptured => "download captured",
            SessionState::Validated(Validation::Success) => "validated",
            SessionState::Validated(Validation::Rejected) => "rejected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a whole workflow run ended. Teardown has always run by then.
#[derive(Debug)]
pub enum WorkflowOutcome {
    /// A validated export is at `path`.
    Succeeded { path: PathBuf },
    /// The run stopped after reaching `state`.
    Failed {
        state: SessionState,
        error: BrowserError,
    },
}

impl WorkflowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Succeeded { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            WorkflowOutcome::Succeeded { path } => Some(path),
            WorkflowOutcome::Failed { .. } => None,
        }
    }
}

/// Owns one browser session and drives it through the workflow.
///
/// Not meant to be shared: one run at a time per controller.
pub struct SessionController<L> {
    launcher: L,
    config: SessionConfig,
    credentials: Credentials,
    state: SessionState,
    driver: Option<Arc<dyn PageDriver>>,
}

impl<L: BrowserLauncher> SessionController<L> {
    pub fn new(launcher: L, config: SessionConfig, credentials: Credentials) -> Self {
        Self {
            launcher,
            config,
            credentials,
            state: SessionState::Unstarted,
            driver: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the whole workflow, stopping early if `shutdown` resolves.
    ///
    /// Teardown runs on every path, including cancellation.
    pub async fn run<F>(&mut self, shutdown: F) -> WorkflowOutcome
    where
        F: Future<Output = ()>,
    {
        let span = tracing::info_span!("browser", url = %self.config.login_url);
        let result = tokio::select! {
            result = self.drive().instrument(span) => result,
            () = shutdown => Err(BrowserError::Cancelled),
        };

        let reached = self.state;
        self.teardown().await;

        match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Workflow finished");
                WorkflowOutcome::Succeeded { path }
            }
            Err(error) => {
                tracing::error!(state = %reached, error = %error, "Workflow failed");
                WorkflowOutcome::Failed {
                    state: reached,
                    error,
                }
            }
        }
    }

    async fn drive(&mut self) -> Result<PathBuf> {
        self.start().await?;
        self.login().await?;
        self.open_target_view().await?;
        let path = self.export_and_download().await?;
        self.validate(&path)?;
        Ok(path)
    }

    /// `Unstarted → BrowserReady`. A launch failure is not retried.
    pub async fn start(&mut self) -> Result<()> {
        if self.driver.is_some() {
            return Ok(());
        }
        let driver = self.launcher.launch(&self.config).await?;
        self.driver = Some(Arc::from(driver));
        self.state = SessionState::BrowserReady;
        tracing::info!("Browser ready");
        Ok(())
    }

    /// `BrowserReady → LoginPageLoaded → Authenticated`.
    pub async fn login(&mut self) -> Result<()> {
        let driver = self.driver()?;
        let contract = self.config.contract.clone();
        let timeouts = self.config.timeouts;

        driver.goto(&self.config.login_url).await?;
        let login_fields = [contract.login_input.as_str(), contract.password_input.as_str()];
        if !wait_for_page(&*driver, "login page", &login_fields, self.page_wait()).await {
            return Err(self.page_timeout("login page"));
        }
        self.state = SessionState::LoginPageLoaded;

        futures::try_join!(
            driver.wait_visible(&contract.login_input, timeouts.selector),
            driver.wait_visible(&contract.password_input, timeouts.selector),
        )?;
        tracing::info!("Login fields located");

        safe_fill(
            &*driver,
            &contract.login_input,
            self.credentials.username().expose_secret(),
        )
        .await?;
        safe_fill(
            &*driver,
            &contract.password_input,
            self.credentials.password().expose_secret(),
        )
        .await?;
        driver.click(&contract.submit).await?;
        tracing::info!("Login form submitted");

        if !wait_for_page(
            &*driver,
            "landing page",
            &[contract.landing_marker.as_str()],
            self.page_wait(),
        )
        .await
        {
            return Err(self.page_timeout("landing page"));
        }
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// `Authenticated → TargetViewLoaded`.
    pub async fn open_target_view(&mut self) -> Result<()> {
        let driver = self.driver()?;
        let contract = self.config.contract.clone();
        let timeouts = self.config.timeouts;

        driver.click(&contract.navigation_target).await?;
        wait_for_loader(
            &*driver,
            &contract.progress_indicator,
            timeouts.loader_grace,
            timeouts.loader_bound,
        )
        .await?;
        if !wait_for_page(
            &*driver,
            "backlog view",
            &[contract.chart_marker.as_str()],
            self.page_wait(),
        )
        .await
        {
            return Err(self.page_timeout("backlog view"));
        }
        self.state = SessionState::TargetViewLoaded;
        Ok(())
    }

    /// `TargetViewLoaded → ExportTriggered → DownloadCaptured`.
    pub async fn export_and_download(&mut self) -> Result<PathBuf> {
        let driver = self.driver()?;
        let download_dir = self.config.download_dir.clone();
        let timeout = self.config.timeouts.download;

        std::fs::create_dir_all(&download_dir).map_err(|source| BrowserError::Io {
            path: download_dir.clone(),
            source,
        })?;

        let pending = driver.expect_download(&download_dir).await?;
        driver.click(&self.config.contract.export_control).await?;
        self.state = SessionState::ExportTriggered;
        tracing::info!("Export triggered, waiting for download");

        let path = match tokio::time::timeout(timeout, pending.finish()).await {
            Ok(result) => result?,
            Err(_) => return Err(BrowserError::DownloadTimeout { timeout }),
        };
        self.state = SessionState::DownloadCaptured;
        tracing::info!(path = %path.display(), "Download captured");
        Ok(path)
    }

    /// `DownloadCaptured → Validated`. A rejected file is deleted.
    pub fn validate(&mut self, path: &Path) -> Result<()> {
        match validate_download(path) {
            Ok(()) => {
                self.state = SessionState::Validated(Validation::Success);
                Ok(())
            }
            Err(error) => {
                self.state = SessionState::Validated(Validation::Rejected);
                Err(error)
            }
        }
    }

    /// Any state → `Closed`. Safe to call more than once; errors are logged only.
    pub async fn teardown(&mut self) {
        if let Some(driver) = self.driver.take() {
            match driver.close().await {
                Ok(()) => tracing::info!("Browser closed"),
                Err(error) => tracing::warn!(error = %error, "Browser teardown failed"),
            }
        }
        self.state = SessionState::Closed;
    }

    fn driver(&self) -> Result<Arc<dyn PageDriver>> {
        self.driver
            .clone()
            .ok_or_else(|| BrowserError::Protocol("browser not started".to_string()))
    }

    fn page_wait(&self) -> PageWait {
        PageWait {
            timeout: self.config.timeouts.page_ready,
            selector_timeout: self.config.timeouts.selector,
        }
    }

    fn page_timeout(&self, what: &str) -> BrowserError {
        BrowserError::NavigationTimeout {
            what: what.to_string(),
            timeout: self.config.timeouts.page_ready,
        }
    }
}

/// Fill `selector` only if it can take input.
async fn safe_fill(driver: &dyn PageDriver, selector: &str, value: &str) -> Result<()> {
    if !driver.is_actionable(selector).await? {
        tracing::error!(selector, "Field is not actionable");
        return Err(BrowserError::ElementNotActionable {
            selector: selector.to_string(),
        });
    }
    driver.fill(selector, value).await
}
