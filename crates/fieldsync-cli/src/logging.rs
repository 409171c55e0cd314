//! Where the workspace's `tracing` events go and how they look.
//!
//! Levels used across the crates:
//!
//! - `error`: workflow failures, unreadable exports
//! - `warn`: column warnings, skipped rows, missing run timestamp
//! - `info`: workflow steps, load strategy, chunk progress
//! - `debug`: wait conditions, per-chunk details
//!
//! Credentials never reach the subscriber; the browser crate keeps them in
//! `SecretString` and only exposes them when filling the form.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Crates whose events follow the configured level. Everything else
/// (chromiumoxide, polars, tokio) stays at `warn`.
const WORKSPACE_CRATES: &[&str] = &[
    "fieldsync",
    "fieldsync_cli",
    "fieldsync_browser",
    "fieldsync_core",
    "fieldsync_ingest",
    "fieldsync_model",
    "fieldsync_normalization",
];

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level for the workspace crates.
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` override `level_filter` when set.
    pub use_env_filter: bool,
    pub with_timestamps: bool,
    pub with_target: bool,
    /// Span close events, JSON only.
    pub with_spans: bool,
    pub with_ansi: bool,
    pub format: LogFormat,
    /// Append here instead of stderr.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_timestamps: true,
            with_target: false,
            with_spans: true,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

impl LogConfig {
    /// warn, then info, debug and trace for each extra `-v`.
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level_filter = match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self {
            level_filter,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the log file path (writes to stderr when None).
    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }
}

/// Install the global subscriber. Fails only when the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    if let Some(path) = &config.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        init_logging_with_writer(config, Mutex::new(file));
    } else {
        init_logging_with_writer(config, io::stderr);
    }
    Ok(())
}

/// Initialize logging with a custom writer.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(output_layer(config, writer))
        .init();
}

/// Formatter for `config.format`, filtered by the workspace directives.
fn output_layer<W>(config: &LogConfig, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(config.with_target);

    match (config.format, config.with_timestamps) {
        (LogFormat::Json, _) => {
            let spans = if config.with_spans {
                FmtSpan::CLOSE
            } else {
                FmtSpan::NONE
            };
            layer.json().with_span_events(spans).with_filter(filter).boxed()
        }
        (LogFormat::Compact, true) => layer
            .compact()
            .with_ansi(config.with_ansi)
            .with_filter(filter)
            .boxed(),
        (LogFormat::Compact, false) => layer
            .compact()
            .with_ansi(config.with_ansi)
            .without_time()
            .with_filter(filter)
            .boxed(),
        (LogFormat::Pretty, true) => layer.with_ansi(config.with_ansi).with_filter(filter).boxed(),
        (LogFormat::Pretty, false) => layer
            .with_ansi(config.with_ansi)
            .without_time()
            .with_filter(filter)
            .boxed(),
    }
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    if config.use_env_filter
        && let Ok(filter) = EnvFilter::try_from_default_env()
    {
        return filter;
    }
    EnvFilter::new(default_directives(config.level_filter))
}

/// `warn` for third-party crates, `level` for ours.
fn default_directives(level: LevelFilter) -> String {
    let mut directives = vec![LevelFilter::WARN.to_string()];
    directives.extend(
        WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{krate}={level}")),
    );
    directives.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn emit(config: &LogConfig) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber =
            tracing_subscriber::registry().with(output_layer(config, move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("Chunk details");
            tracing::info!(rows = 3, "Loaded export");
        });
        captured.text()
    }

    fn quiet_env(config: LogConfig) -> LogConfig {
        LogConfig {
            use_env_filter: false,
            with_ansi: false,
            ..config
        }
    }

    #[test]
    fn test_json_layer_writes_structured_fields() {
        let config = quiet_env(LogConfig::from_verbosity(1).with_format(LogFormat::Json));
        let output = emit(&config);

        assert!(output.contains(r#""message":"Loaded export""#), "{output}");
        assert!(output.contains(r#""rows":3"#), "{output}");
        assert!(!output.contains("Chunk details"));
    }

    #[test]
    fn test_untimed_compact_layer_respects_level() {
        let config = LogConfig {
            with_timestamps: false,
            ..quiet_env(LogConfig::from_verbosity(2).with_format(LogFormat::Compact))
        };
        let output = emit(&config);

        assert!(output.contains("Chunk details"), "{output}");
        assert!(output.contains("rows=3"), "{output}");
    }

    #[test]
    fn test_pretty_layer_drops_events_below_level() {
        let config = quiet_env(LogConfig::from_verbosity(0));
        assert!(emit(&config).is_empty());
    }

    #[test]
    fn test_from_verbosity_levels() {
        assert_eq!(LogConfig::from_verbosity(0).level_filter, LevelFilter::WARN);
        assert_eq!(LogConfig::from_verbosity(1).level_filter, LevelFilter::INFO);
        assert_eq!(LogConfig::from_verbosity(2).level_filter, LevelFilter::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9).level_filter, LevelFilter::TRACE);
    }

    #[test]
    fn test_default_directives_keep_dependencies_quiet() {
        let directives = default_directives(LevelFilter::DEBUG);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("fieldsync_browser=debug"));
        assert!(directives.contains("fieldsync_ingest=debug"));
        assert!(!directives.contains("chromiumoxide"));
    }

    #[test]
    fn test_off_level_silences_workspace() {
        let directives = default_directives(LevelFilter::OFF);
        assert!(directives.contains("fieldsync_core=off"));
    }
}
