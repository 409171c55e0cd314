//! Browser half of the backlog sync.
//!
//! [`SessionController`] logs into the remote work-order system, opens the
//! backlog view, triggers the CSV export and captures the download. The
//! engine sits behind [`PageDriver`]; [`ChromiumLauncher`] provides the real
//! one.
//!
//! The only contract with ingestion is the path of a validated export.

mod chromium;
mod config;
mod driver;
mod error;
mod session;
mod validator;
mod wait;

#[cfg(test)]
mod testing;

pub use chromium::{ChromiumDriver, ChromiumLauncher};
pub use config::{
    Credentials, DEFAULT_LOGIN_URL, DEFAULT_PROFILE_DIR, DEFAULT_USER_AGENT, SessionConfig,
    Timeouts, UiContract,
};
pub use driver::{BrowserLauncher, PageDriver, PendingDownload};
pub use error::{BrowserError, Result};
pub use session::{SessionController, SessionState, Validation, WorkflowOutcome};
pub use validator::validate_download;
pub use wait::{Condition, JoinOutcome, PageWait, join_conditions, wait_for_loader, wait_for_page};
