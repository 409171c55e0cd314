//! TOML configuration file.
//!
//! Every key is optional. A missing file means defaults; a file that does not
//! parse is a hard error, since running with the wrong selectors would drive
//! the remote UI blindly.
//!
//! ```toml
//! downloads_dir = "/home/me/Downloads"
//! export_prefix = "backlog"
//!
//! [browser]
//! login_url = "https://example.org/login"
//! headless = true
//!
//! [browser.timeouts]
//! download_secs = 600
//!
//! [browser.contract]
//! export_control = "button#exportCsv"
//!
//! [ingest]
//! chunk_size = 5000
//! encodings = ["windows-1252", "utf-8"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use directories::{ProjectDirs, UserDirs};
use serde::Deserialize;

use fieldsync_browser::{
    DEFAULT_LOGIN_URL, DEFAULT_PROFILE_DIR, DEFAULT_USER_AGENT, SessionConfig, Timeouts,
    UiContract,
};
use fieldsync_core::DEFAULT_EXPORT_PREFIX;
use fieldsync_ingest::{
    DEFAULT_AVG_ROW_BYTES, DEFAULT_CHUNK_SIZE, DEFAULT_DELIMITER, DEFAULT_SAMPLE_SIZE,
    DEFAULT_SIZE_THRESHOLD_BYTES, EncodingPolicy, LoaderOptions,
};

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where exports land. Defaults to the platform download directory.
    pub downloads_dir: Option<PathBuf>,
    pub export_prefix: String,
    pub browser: BrowserSection,
    pub ingest: IngestSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            downloads_dir: None,
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            browser: BrowserSection::default(),
            ingest: IngestSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    pub login_url: String,
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub timeouts: TimeoutSection,
    pub contract: UiContract,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            profile_dir: PathBuf::from(DEFAULT_PROFILE_DIR),
            headless: false,
            viewport_width: 1366,
            viewport_height: 768,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeouts: TimeoutSection::default(),
            contract: UiContract::default(),
        }
    }
}

/// Step timeouts in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSection {
    pub page_ready_secs: u64,
    pub selector_secs: u64,
    pub loader_grace_secs: u64,
    pub loader_bound_secs: u64,
    pub download_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            page_ready_secs: defaults.page_ready.as_secs(),
            selector_secs: defaults.selector.as_secs(),
            loader_grace_secs: defaults.loader_grace.as_secs(),
            loader_bound_secs: defaults.loader_bound.as_secs(),
            download_secs: defaults.download.as_secs(),
        }
    }
}

impl From<TimeoutSection> for Timeouts {
    fn from(section: TimeoutSection) -> Self {
        Timeouts {
            page_ready: Duration::from_secs(section.page_ready_secs),
            selector: Duration::from_secs(section.selector_secs),
            loader_grace: Duration::from_secs(section.loader_grace_secs),
            loader_bound: Duration::from_secs(section.loader_bound_secs),
            download: Duration::from_secs(section.download_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestSection {
    pub size_threshold_bytes: u64,
    pub avg_row_bytes: u64,
    pub row_threshold: u64,
    pub chunk_size: usize,
    pub sample_size: usize,
    pub progress_interval: usize,
    pub delimiter: char,
    /// WHATWG encoding labels, most probable first.
    pub encodings: Vec<String>,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD_BYTES,
            avg_row_bytes: DEFAULT_AVG_ROW_BYTES,
            row_threshold: DEFAULT_CHUNK_SIZE as u64,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            progress_interval: DEFAULT_CHUNK_SIZE * 5,
            delimiter: char::from(DEFAULT_DELIMITER),
            encodings: vec!["windows-1252".to_string(), "utf-8".to_string()],
        }
    }
}

impl IngestSection {
    pub fn loader_options(&self) -> Result<LoaderOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        if self.encodings.is_empty() {
            bail!("at least one encoding must be configured");
        }
        let encodings = EncodingPolicy::from_labels(&self.encodings)
            .map_err(|label| anyhow!("unknown encoding label: {label}"))?;
        Ok(LoaderOptions::default()
            .with_size_threshold(self.size_threshold_bytes)
            .with_avg_row_bytes(self.avg_row_bytes)
            .with_row_threshold(self.row_threshold)
            .with_chunk_size(self.chunk_size)
            .with_sample_size(self.sample_size)
            .with_progress_interval(self.progress_interval)
            .with_delimiter(self.delimiter as u8)
            .with_encodings(encodings))
    }
}

impl AppConfig {
    /// Load `path`, or the default location when `path` is None.
    ///
    /// Only the default location may be absent; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                Some(path) => {
                    tracing::debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Configured downloads directory, else the platform one.
    pub fn downloads_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.downloads_dir {
            return Ok(dir.clone());
        }
        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .context("no downloads directory configured and none found for this platform")
    }

    pub fn session_config(&self, download_dir: PathBuf) -> SessionConfig {
        let browser = &self.browser;
        SessionConfig {
            login_url: browser.login_url.clone(),
            profile_dir: browser.profile_dir.clone(),
            download_dir,
            headless: browser.headless,
            viewport: (browser.viewport_width, browser.viewport_height),
            user_agent: browser.user_agent.clone(),
            timeouts: browser.timeouts.into(),
            contract: browser.contract.clone(),
        }
    }
}

/// `<platform config dir>/fieldsync/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fieldsync").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.export_prefix, "backlog");
        assert_eq!(config.browser.timeouts.download_secs, 300);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            downloads_dir = "/data/exports"

            [browser]
            headless = true

            [browser.timeouts]
            download_secs = 600

            [browser.contract]
            export_control = "button#exportCsv"

            [ingest]
            chunk_size = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.downloads_dir, Some(PathBuf::from("/data/exports")));
        assert!(config.browser.headless);
        assert_eq!(config.browser.timeouts.download_secs, 600);
        assert_eq!(config.browser.timeouts.page_ready_secs, 60);
        assert_eq!(config.browser.contract.export_control, "button#exportCsv");
        assert_eq!(
            config.browser.contract.login_input,
            UiContract::default().login_input
        );
        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.sample_size, DEFAULT_SAMPLE_SIZE);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = AppConfig::from_toml("[browser]\nheadles = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[browser\nheadless = ").unwrap();
        let error = AppConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{error:#}").contains("parse config"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_session_config_carries_timeouts_and_contract() {
        let mut config = AppConfig::default();
        config.browser.timeouts.selector_secs = 3;
        config.browser.viewport_width = 1920;
        let session = config.session_config(PathBuf::from("/tmp/dl"));

        assert_eq!(session.download_dir, PathBuf::from("/tmp/dl"));
        assert_eq!(session.timeouts.selector, Duration::from_secs(3));
        assert_eq!(session.viewport, (1920, 768));
        assert_eq!(session.contract, UiContract::default());
    }

    #[test]
    fn test_loader_options_from_section() {
        let section = IngestSection {
            chunk_size: 250,
            delimiter: ',',
            encodings: vec!["utf-8".to_string()],
            ..IngestSection::default()
        };
        let options = section.loader_options().unwrap();
        assert_eq!(options.chunk_size, 250);
        assert_eq!(options.delimiter, b',');
        let names: Vec<_> = options.encodings.candidates().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["UTF-8"]);
    }

    #[test]
    fn test_unknown_encoding_label_is_rejected() {
        let section = IngestSection {
            encodings: vec!["klingon".to_string()],
            ..IngestSection::default()
        };
        let error = section.loader_options().unwrap_err();
        assert!(error.to_string().contains("klingon"));
    }

    #[test]
    fn test_configured_downloads_dir_wins() {
        let config = AppConfig {
            downloads_dir: Some(PathBuf::from("/srv/exports")),
            ..AppConfig::default()
        };
        assert_eq!(config.downloads_dir().unwrap(), PathBuf::from("/srv/exports"));
    }
}
