//! Session configuration: the UI contract, timeouts and credentials.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Login page of the remote work-order system.
pub const DEFAULT_LOGIN_URL: &str = "https://4field.timbrasil.com.br/login";

/// Persistent profile directory, relative to the working directory.
pub const DEFAULT_PROFILE_DIR: &str = "chrome_profile_normal";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Named selectors the workflow drives.
///
/// The selectors are injected configuration; the state machine only relies
/// on each of them existing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiContract {
    pub login_input: String,
    pub password_input: String,
    pub submit: String,
    /// Present only on the landing page after a successful login.
    pub landing_marker: String,
    /// Control that opens the backlog view.
    pub navigation_target: String,
    /// Busy indicator shown while the view loads.
    pub progress_indicator: String,
    /// Rendered once the view's chart has data.
    pub chart_marker: String,
    pub export_control: String,
}

impl Default for UiContract {
    fn default() -> Self {
        Self {
            login_input: "input.resource-id".to_string(),
            password_input: "input.senha".to_string(),
            submit: ".continue".to_string(),
            landing_marker: "#home".to_string(),
            navigation_target: "a[href*='backlog']".to_string(),
            progress_indicator: ".loading".to_string(),
            chart_marker: ".highcharts-root".to_string(),
            export_control: "button.export-csv".to_string(),
        }
    }
}

/// Timeouts for each step. They are per step and do not accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on one whole wait-for-page.
    pub page_ready: Duration,
    /// Bound on a single selector becoming visible.
    pub selector: Duration,
    /// How long to look for the progress indicator before assuming it was too fast to see.
    pub loader_grace: Duration,
    /// How long the progress indicator may stay visible.
    pub loader_bound: Duration,
    pub download: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_ready: Duration::from_secs(60),
            selector: Duration::from_secs(15),
            loader_grace: Duration::from_secs(5),
            loader_bound: Duration::from_secs(120),
            download: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub login_url: String,
    pub profile_dir: PathBuf,
    /// Where captured downloads are saved.
    pub download_dir: PathBuf,
    pub headless: bool,
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub timeouts: Timeouts,
    pub contract: UiContract,
}

impl SessionConfig {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            profile_dir: PathBuf::from(DEFAULT_PROFILE_DIR),
            download_dir: download_dir.into(),
            headless: false,
            viewport: (1366, 768),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeouts: Timeouts::default(),
            contract: UiContract::default(),
        }
    }
}

/// Login and password for the remote system.
///
/// Never logged; the values are only exposed when filling the form.
#[derive(Clone)]
pub struct Credentials {
    username: SecretString,
    password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: SecretString::from(username.into()),
            password: SecretString::from(password.into()),
        }
    }

    pub fn username(&self) -> &SecretString {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn is_complete(&self) -> bool {
        !self.username.expose_secret().is_empty() && !self.password.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials::new("joao.silva", "s3nha!");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("joao.silva"));
        assert!(!rendered.contains("s3nha!"));
        assert!(credentials.is_complete());
        assert!(!Credentials::new("", "x").is_complete());
    }

    #[test]
    fn test_contract_partial_override() {
        let contract: UiContract =
            serde_json::from_str(r#"{"export_control": "a.download"}"#).unwrap();
        assert_eq!(contract.export_control, "a.download");
        assert_eq!(contract.login_input, "input.resource-id");
    }
}
