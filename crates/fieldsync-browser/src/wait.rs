//! Composite page readiness and loader waits.

use std::time::{Duration, Instant};

use futures::future::{BoxFuture, join_all};

use crate::driver::PageDriver;
use crate::error::{BrowserError, Result};

/// One named condition of a joined wait.
pub struct Condition<'a> {
    pub name: String,
    pub future: BoxFuture<'a, Result<()>>,
}

impl<'a> Condition<'a> {
    pub fn new(name: impl Into<String>, future: BoxFuture<'a, Result<()>>) -> Self {
        Self {
            name: name.into(),
            future,
        }
    }
}

/// Result of [`join_conditions`].
#[derive(Debug)]
pub enum JoinOutcome {
    AllSucceeded,
    /// Every condition finished, some with an error.
    Failed(Vec<(String, BrowserError)>),
    /// The deadline passed first; unfinished conditions were abandoned.
    TimedOut,
}

/// Run all `conditions` concurrently under one deadline.
///
/// A failing condition does not stop the others; failures are collected.
pub async fn join_conditions(conditions: Vec<Condition<'_>>, deadline: Duration) -> JoinOutcome {
    let (names, futures): (Vec<String>, Vec<_>) =
        conditions.into_iter().map(|c| (c.name, c.future)).unzip();

    match tokio::time::timeout(deadline, join_all(futures)).await {
        Ok(results) => {
            let failures: Vec<(String, BrowserError)> = names
                .into_iter()
                .zip(results)
                .filter_map(|(name, result)| result.err().map(|e| (name, e)))
                .collect();
            if failures.is_empty() {
                JoinOutcome::AllSucceeded
            } else {
                JoinOutcome::Failed(failures)
            }
        }
        Err(_) => JoinOutcome::TimedOut,
    }
}

/// Bounds for [`wait_for_page`].
#[derive(Debug, Clone, Copy)]
pub struct PageWait {
    pub timeout: Duration,
    pub selector_timeout: Duration,
}

/// Wait for network idle, document ready and every selector in
/// `selectors` to be visible, all under `wait.timeout`.
///
/// On timeout the selectors are counted once more; if any of them is
/// present the page is treated as slow rather than broken.
pub async fn wait_for_page(
    driver: &dyn PageDriver,
    step: &str,
    selectors: &[&str],
    wait: PageWait,
) -> bool {
    tracing::info!(step, "Waiting for page");
    let started = Instant::now();

    let mut conditions = vec![
        Condition::new("network idle", driver.wait_network_idle()),
        Condition::new("document ready", driver.wait_document_ready()),
    ];
    for selector in selectors {
        conditions.push(Condition::new(
            format!("visible {selector}"),
            driver.wait_visible(selector, wait.selector_timeout),
        ));
    }

    match join_conditions(conditions, wait.timeout).await {
        JoinOutcome::AllSucceeded => {
            tracing::info!(
                step,
                elapsed = %format!("{:.1}s", started.elapsed().as_secs_f32()),
                "Page ready"
            );
            true
        }
        JoinOutcome::Failed(failures) => {
            for (condition, error) in &failures {
                tracing::error!(step, condition = %condition, error = %error, "Page condition failed");
            }
            false
        }
        JoinOutcome::TimedOut => {
            tracing::error!(step, timeout_secs = wait.timeout.as_secs(), "Page wait timed out");
            critical_selectors_present(driver, step, selectors).await
        }
    }
}

async fn critical_selectors_present(driver: &dyn PageDriver, step: &str, selectors: &[&str]) -> bool {
    for selector in selectors {
        match driver.count(selector).await {
            Ok(n) if n > 0 => {
                tracing::info!(step, selector, "Critical element present despite timeout");
                return true;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(step, selector, error = %error, "Fallback count failed");
            }
        }
    }
    false
}

/// Two-phase wait on a progress indicator.
///
/// An indicator that does not show up within `grace` counts as success.
/// One that shows up must disappear within `bound`.
pub async fn wait_for_loader(
    driver: &dyn PageDriver,
    selector: &str,
    grace: Duration,
    bound: Duration,
) -> Result<()> {
    match tokio::time::timeout(grace, driver.wait_visible(selector, grace)).await {
        Err(_) | Ok(Err(BrowserError::NavigationTimeout { .. })) => {
            tracing::debug!(selector, "Loader never appeared");
            return Ok(());
        }
        Ok(Err(other)) => return Err(other),
        Ok(Ok(())) => {}
    }

    tracing::debug!(selector, "Loader visible, waiting for it to clear");
    driver.wait_hidden(selector, bound).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Behavior, ScriptedDriver};

    fn page_wait(secs: u64) -> PageWait {
        PageWait {
            timeout: Duration::from_secs(secs),
            selector_timeout: Duration::from_secs(secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_times_out_at_deadline() {
        let start = tokio::time::Instant::now();
        let conditions = vec![
            Condition::new("ready", Box::pin(async { Ok::<(), BrowserError>(()) })),
            Condition::new("never", Box::pin(futures::future::pending::<Result<()>>())),
        ];

        let outcome = join_conditions(conditions, Duration::from_secs(2)).await;

        assert!(matches!(outcome, JoinOutcome::TimedOut));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_collects_failures_without_short_circuit() {
        let conditions = vec![
            Condition::new(
                "fails",
                Box::pin(async { Err::<(), _>(BrowserError::Protocol("boom".into())) }),
            ),
            Condition::new(
                "slow",
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    Ok::<(), BrowserError>(())
                }),
            ),
        ];

        let outcome = join_conditions(conditions, Duration::from_secs(5)).await;

        match outcome {
            JoinOutcome::Failed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "fails");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_ready_when_all_conditions_hold() {
        let driver = ScriptedDriver::new().visible("input.senha", Behavior::After(Duration::from_secs(1)));

        assert!(wait_for_page(&driver, "login", &["input.senha"], page_wait(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_wait_fails_after_timeout_without_fallback() {
        let driver = ScriptedDriver::new().network_idle(Behavior::Never);
        let start = tokio::time::Instant::now();

        assert!(!wait_for_page(&driver, "login", &[], page_wait(2)).await);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fallback_accepts_present_selectors() {
        let driver = ScriptedDriver::new()
            .network_idle(Behavior::Never)
            .present("#home");

        assert!(wait_for_page(&driver, "landing", &["#home"], page_wait(2)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fallback_accepts_any_present_selector() {
        let driver = ScriptedDriver::new()
            .network_idle(Behavior::Never)
            .present("#menu");

        assert!(wait_for_page(&driver, "landing", &["#home", "#menu"], page_wait(2)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fallback_rejects_when_no_selector_present() {
        let driver = ScriptedDriver::new()
            .network_idle(Behavior::Never)
            .present("#footer");

        assert!(!wait_for_page(&driver, "landing", &["#home", "#menu"], page_wait(2)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_condition_fails_page_wait() {
        let driver = ScriptedDriver::new().document_ready(Behavior::Fail);

        assert!(!wait_for_page(&driver, "login", &[], page_wait(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_that_never_appears_is_success() {
        let driver = ScriptedDriver::new().visible(".loading", Behavior::Never);
        let start = tokio::time::Instant::now();

        let result = wait_for_loader(
            &driver,
            ".loading",
            Duration::from_secs(5),
            Duration::from_secs(120),
        )
        .await;

        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loader_that_clears_is_success() {
        let driver = ScriptedDriver::new()
            .visible(".loading", Behavior::Ready)
            .hidden(".loading", Behavior::After(Duration::from_secs(30)));

        let result = wait_for_loader(
            &driver,
            ".loading",
            Duration::from_secs(5),
            Duration::from_secs(120),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_loader_is_hard_failure() {
        let driver = ScriptedDriver::new()
            .visible(".loading", Behavior::Ready)
            .hidden(".loading", Behavior::Never);

        let result = wait_for_loader(
            &driver,
            ".loading",
            Duration::from_secs(5),
            Duration::from_secs(120),
        )
        .await;

        assert!(matches!(result, Err(BrowserError::NavigationTimeout { .. })));
    }
}
