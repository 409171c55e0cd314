//! CLI argument definitions for fieldsync.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "fieldsync",
    version,
    about = "Export the work-order backlog and load it into a clean table",
    long_about = "Log into the remote work-order system, export the backlog CSV and \
                  normalize it.\n\n\
                  The export is read with an encoding fallback, loaded in chunks when \
                  large, and normalized to canonical column names, ISO dates and \
                  digit-only ids."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: platform config dir, fieldsync/config.toml).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override the downloads directory from the configuration.
    #[arg(long = "downloads-dir", value_name = "DIR", global = true)]
    pub downloads_dir: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Export the backlog from the browser, then ingest it.
    Run(RunArgs),

    /// Ingest an export already on disk.
    Process(ProcessArgs),

    /// Export the backlog from the browser without ingesting it.
    Scrape(ScrapeArgs),

    /// Delete the most recent export from the downloads directory.
    Clean,
}

/// Environment variable holding the password. There is no flag for it, so it
/// never lands in process listings or shell history.
pub const PASSWORD_ENV: &str = "FIELDSYNC_PASSWORD";

#[derive(Args)]
pub struct CredentialArgs {
    /// Login for the remote system. The password is read from FIELDSYNC_PASSWORD.
    #[arg(long = "username", env = "FIELDSYNC_USERNAME", hide_env_values = true)]
    pub username: String,
}

#[derive(Args)]
pub struct BrowserArgs {
    /// Run the browser without a window.
    #[arg(long = "headless")]
    pub headless: bool,
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(flatten)]
    pub browser: BrowserArgs,

    /// Delete the export once it has been ingested successfully.
    #[arg(long = "delete-after")]
    pub delete_after: bool,

    /// Print the first rows of the normalized table.
    #[arg(long = "preview", value_name = "ROWS")]
    pub preview: Option<usize>,
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// Export to ingest (default: newest `<prefix>*` file in the downloads directory).
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the first rows of the normalized table.
    #[arg(long = "preview", value_name = "ROWS")]
    pub preview: Option<usize>,

    /// Ingest without a run timestamp column.
    #[arg(long = "no-timestamp")]
    pub no_timestamp: bool,
}

#[derive(Parser)]
pub struct ScrapeArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
