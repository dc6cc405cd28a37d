//! Drives Chrome to collect [`DomSnapshot`]s.
//!
//! The page is loaded, given `settle_delay_ms` to finish client rendering,
//! and the collector script is evaluated. With a watch window, the current
//! path is polled and every route change triggers another settle + audit,
//! which covers client-side navigation in a single-page app.

use super::{CtaAuditor, CtaStats, DomSnapshot, RouteWatcher};
use crate::config::CtaConfig;
use crate::types::ValidationResult;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::time::{Duration, Instant};
use thiserror::Error;

const COLLECTOR: &str = include_str!("collector.js");

#[derive(Error, Debug)]
pub enum CtaError {
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Collector returned no value")]
    NoValue,
    #[error("Invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn browser_err(e: impl std::fmt::Display) -> CtaError {
    CtaError::Browser(e.to_string())
}

/// The collector script with this config's selectors substituted in.
pub fn collector_script(config: &CtaConfig) -> Result<String, CtaError> {
    Ok(COLLECTOR
        .replace("__SELECTORS__", &serde_json::to_string(&config.selectors)?)
        .replace(
            "__IGNORE_ATTR__",
            &serde_json::to_string(&config.ignore_attribute)?,
        ))
}

/// Run the collector in `tab` and decode its output.
pub fn collect_snapshot(tab: &Tab, config: &CtaConfig) -> Result<DomSnapshot, CtaError> {
    let script = collector_script(config)?;
    let value = tab
        .evaluate(&script, false)
        .map_err(browser_err)?
        .value
        .ok_or(CtaError::NoValue)?;
    let json = value.as_str().ok_or(CtaError::NoValue)?;
    Ok(serde_json::from_str(json)?)
}

fn current_path(tab: &Tab) -> Result<String, CtaError> {
    let value = tab
        .evaluate("location.pathname", false)
        .map_err(browser_err)?
        .value
        .ok_or(CtaError::NoValue)?;
    Ok(value.as_str().unwrap_or_default().to_string())
}

/// Launch Chrome headless with a phone-sized viewport.
pub fn launch() -> Result<Browser, CtaError> {
    Browser::new(LaunchOptions {
        window_size: Some((390, 844)),
        ..Default::default()
    })
    .map_err(browser_err)
}

/// Audit `url`, then keep watching for route changes for `watch`.
///
/// `on_report` is called once per audited route. Returns how many audits ran.
/// A disabled auditor never launches the browser.
pub fn run(
    url: &str,
    auditor: &CtaAuditor,
    watch: Duration,
    mut on_report: impl FnMut(&ValidationResult<CtaStats>),
) -> Result<usize, CtaError> {
    if !auditor.enabled() {
        on_report(&auditor.audit(&DomSnapshot::default()));
        return Ok(0);
    }
    let config = auditor.config();
    let settle = Duration::from_millis(config.settle_delay_ms);
    let poll = Duration::from_millis(config.poll_interval_ms.max(50));

    let browser = launch()?;
    let tab = browser.new_tab().map_err(browser_err)?;
    tracing::debug!("navigating to {url}");
    tab.navigate_to(url)
        .map_err(browser_err)?
        .wait_until_navigated()
        .map_err(browser_err)?;

    let mut watcher = RouteWatcher::new();
    let mut audits = 0;
    let deadline = Instant::now() + watch;
    loop {
        let path = current_path(&tab)?;
        if watcher.observe(&path) {
            std::thread::sleep(settle);
            let snapshot = collect_snapshot(&tab, config)?;
            tracing::debug!(
                "collected {} candidates on {}",
                snapshot.candidates.len(),
                snapshot.path
            );
            on_report(&auditor.audit(&snapshot));
            audits += 1;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(poll);
    }
    Ok(audits)
}
