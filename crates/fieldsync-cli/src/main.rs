//! fieldsync CLI.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use fieldsync_cli::config::AppConfig;
use fieldsync_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_clean, run_process, run_scrape, run_sync};
use crate::summary::{print_export_path, print_preview, print_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match execute(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn execute(cli: &Cli) -> Result<i32> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let downloads_dir = resolve_downloads_dir(cli, &config)?;
    let code = match &cli.command {
        Command::Run(args) => {
            let result = run_sync(&config, downloads_dir, args)?;
            print_summary(&result);
            if let (Some(rows), Some(table)) = (args.preview, result.table.as_ref()) {
                print_preview(table, rows);
            }
            exit_code(result.success)
        }
        Command::Process(args) => {
            let result = run_process(&config, downloads_dir, args)?;
            print_summary(&result);
            if let (Some(rows), Some(table)) = (args.preview, result.table.as_ref()) {
                print_preview(table, rows);
            }
            exit_code(result.success)
        }
        Command::Scrape(args) => {
            let path = run_scrape(&config, downloads_dir, args)?;
            print_export_path(&path);
            0
        }
        Command::Clean => {
            let path = run_clean(&config, downloads_dir)?;
            print_export_path(&path);
            0
        }
    };
    Ok(code)
}

fn resolve_downloads_dir(cli: &Cli, config: &AppConfig) -> Result<PathBuf> {
    match &cli.downloads_dir {
        Some(dir) => Ok(dir.clone()),
        None => config.downloads_dir(),
    }
}

fn exit_code(success: bool) -> i32 {
    if success { 0 } else { 1 }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
