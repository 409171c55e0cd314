use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Local;

use fieldsync_browser::{ChromiumLauncher, Credentials, SessionController, WorkflowOutcome};
use fieldsync_core::{BacklogProcessor, FileProcessingResult};
use fieldsync_cli::config::AppConfig;

use crate::cli::{CredentialArgs, PASSWORD_ENV, ProcessArgs, RunArgs, ScrapeArgs};

/// Full workflow: export from the browser, then ingest what it captured.
pub fn run_sync(
    config: &AppConfig,
    downloads_dir: PathBuf,
    args: &RunArgs,
) -> Result<FileProcessingResult> {
    let processor = build_processor(config, downloads_dir.clone(), true)?;
    let outcome = scrape(config, downloads_dir, &args.credentials, args.browser.headless)?;
    let path = match outcome {
        WorkflowOutcome::Succeeded { path } => path,
        WorkflowOutcome::Failed { state, error } => {
            bail!("browser workflow failed after reaching '{state}': {error}")
        }
    };

    ingest_captured(&processor, &path, args.delete_after)
}

/// Process the file the browser just saved, optionally removing it afterwards.
fn ingest_captured(
    processor: &BacklogProcessor,
    path: &Path,
    delete_after: bool,
) -> Result<FileProcessingResult> {
    let result = processor.process_most_recent_file(Some(path), None);
    if result.success && delete_after {
        processor
            .delete_file(path)
            .context("delete processed export")?;
        tracing::info!(path = %path.display(), "Export removed after processing");
    }
    Ok(result)
}

pub fn run_process(
    config: &AppConfig,
    downloads_dir: PathBuf,
    args: &ProcessArgs,
) -> Result<FileProcessingResult> {
    let processor = build_processor(config, downloads_dir, !args.no_timestamp)?;
    Ok(processor.process_most_recent_file(args.path.as_deref(), None))
}

pub fn run_scrape(
    config: &AppConfig,
    downloads_dir: PathBuf,
    args: &ScrapeArgs,
) -> Result<PathBuf> {
    match scrape(config, downloads_dir, &args.credentials, args.browser.headless)? {
        WorkflowOutcome::Succeeded { path } => Ok(path),
        WorkflowOutcome::Failed { state, error } => {
            bail!("browser workflow failed after reaching '{state}': {error}")
        }
    }
}

pub fn run_clean(config: &AppConfig, downloads_dir: PathBuf) -> Result<PathBuf> {
    let processor = build_processor(config, downloads_dir, false)?;
    Ok(processor.delete_most_recent_file()?)
}

fn build_processor(
    config: &AppConfig,
    downloads_dir: PathBuf,
    stamp: bool,
) -> Result<BacklogProcessor> {
    let options = config
        .ingest
        .loader_options()
        .context("invalid [ingest] configuration")?;
    let processor = BacklogProcessor::new(downloads_dir)
        .with_prefix(config.export_prefix.clone())
        .with_loader_options(options);
    if stamp {
        Ok(processor.with_run_timestamp(Local::now().naive_local()))
    } else {
        Ok(processor)
    }
}

/// Drive the browser half on a fresh runtime. Ctrl-C cancels the current step;
/// teardown still runs.
fn scrape(
    config: &AppConfig,
    downloads_dir: PathBuf,
    credentials: &CredentialArgs,
    headless: bool,
) -> Result<WorkflowOutcome> {
    let password = resolve_password(std::env::var(PASSWORD_ENV).ok())?;
    let credentials = Credentials::new(credentials.username.clone(), password);
    if !credentials.is_complete() {
        bail!("username and password must not be empty");
    }

    let mut session = config.session_config(downloads_dir);
    session.headless |= headless;

    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    let outcome = runtime.block_on(async {
        let mut controller = SessionController::new(ChromiumLauncher, session, credentials);
        controller
            .run(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    // No signal handler: never cancel.
                    std::future::pending::<()>().await;
                }
                tracing::warn!("Interrupted, closing the browser");
            })
            .await
    });
    Ok(outcome)
}

fn resolve_password(value: Option<String>) -> Result<String> {
    value
        .filter(|password| !password.is_empty())
        .with_context(|| format!("set the password in the {PASSWORD_ENV} environment variable"))
}
