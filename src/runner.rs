//! Run orchestration: probe, warm-up, the four checks, teardown, report
//!
//! Checks run strictly in order, each inside its own failure boundary.
//! A failed check records FAIL and the run moves on; nothing short of a
//! harness setup error (driver unavailable) aborts the sequence.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::artifacts::{self, ScreenshotRecord};
use crate::checks::{self, CheckContext, Outcome};
use crate::driver::{DriverConfig, PageDriver};
use crate::error::SmokeResult;
use crate::probe;

const WARMUP_TIMEOUT: Duration = Duration::from_secs(120);

/// One recorded check outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
    pub checks: Vec<CheckReport>,
    pub screenshots: Vec<ScreenshotRecord>,
}

impl RunReport {
    pub fn new(
        checks: Vec<CheckReport>,
        duration_ms: u64,
        screenshots: Vec<ScreenshotRecord>,
    ) -> Self {
        let passed = checks
            .iter()
            .filter(|c| c.outcome == Outcome::Pass)
            .count();
        let failed = checks.iter().filter(|c| c.outcome.is_fail()).count();
        let skipped = checks
            .iter()
            .filter(|c| c.outcome == Outcome::Skip)
            .count();

        Self {
            total: checks.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            finished_at: Utc::now(),
            checks,
            screenshots,
        }
    }

    /// A run succeeds iff no check recorded FAIL; SKIP is not a failure
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Smoke-test runner
pub struct SmokeRunner {
    config: RunnerConfig,
}

impl SmokeRunner {
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute the full run: setup, four checks, teardown, summary
    pub async fn run(&self) -> SmokeResult<RunReport> {
        let start = Instant::now();

        std::fs::create_dir_all(&self.config.screenshot_dir)?;

        if let Err(e) =
            probe::wait_for_server(&self.config.base_url, self.config.server_wait).await
        {
            warn!("Proceeding without readiness confirmation: {}", e);
        }

        let mut page = PageDriver::spawn(&self.config.driver).await?;
        self.warm_up(&page).await;

        let cx = CheckContext {
            base_url: self.config.base_url.clone(),
            screenshot_dir: self.config.screenshot_dir.clone(),
        };

        let mut reports = Vec::with_capacity(4);
        reports.push(
            self.run_check(
                &page,
                checks::HOMEPAGE_ELEMENTS,
                Some("homepage_error"),
                checks::homepage_elements(&page, &cx),
            )
            .await,
        );
        reports.push(
            self.run_check(
                &page,
                checks::PRICES_LOAD,
                Some("prices_error"),
                checks::prices_load(&page, &cx),
            )
            .await,
        );
        reports.push(
            self.run_check(
                &page,
                checks::THEME_TOGGLE,
                Some("theme_error"),
                checks::theme_toggle(&page, &cx),
            )
            .await,
        );
        reports.push(
            self.run_check(
                &page,
                checks::COIN_SELECTOR,
                None,
                checks::coin_selector(&page, &cx),
            )
            .await,
        );

        page.shutdown().await;

        let screenshots = artifacts::collect(&self.config.screenshot_dir)?;
        let report = RunReport::new(reports, start.elapsed().as_millis() as u64, screenshots);
        self.print_summary(&report);

        Ok(report)
    }

    /// First request can trigger on-demand compilation in the target
    /// app; absorb that latency here so the timed checks see a warm
    /// server. Warm-up errors are logged, never fatal.
    async fn warm_up(&self, page: &PageDriver) {
        info!("Warming up target app (first request may trigger compilation)...");
        match page
            .goto(&self.config.base_url, Some("commit"), WARMUP_TIMEOUT)
            .await
        {
            Ok(()) => match page.wait_for_load("networkidle", WARMUP_TIMEOUT).await {
                Ok(()) => info!("Warmup complete"),
                Err(e) => warn!("Warmup load state: {}", e),
            },
            Err(e) => warn!("Warmup navigation: {}", e),
        }
    }

    /// Failure boundary for one check: any error becomes a FAIL outcome
    /// with a diagnostic screenshot, and the run continues.
    async fn run_check<F>(
        &self,
        page: &PageDriver,
        name: &'static str,
        error_shot: Option<&'static str>,
        check: F,
    ) -> CheckReport
    where
        F: Future<Output = SmokeResult<Outcome>>,
    {
        info!("Running: {}", name);
        let start = Instant::now();

        let outcome = match check.await {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(shot) = error_shot {
                    let path = self.config.screenshot_dir.join(format!("{}.png", shot));
                    if let Err(shot_err) = page.screenshot(&path, true).await {
                        warn!("Could not capture failure screenshot: {}", shot_err);
                    }
                }
                Outcome::Fail(e.to_string())
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Pass => info!("✓ {} ({} ms)", name, duration_ms),
            Outcome::Fail(msg) => error!("✗ {} - {}", name, msg),
            Outcome::Skip => info!("- {} (skipped)", name),
        }

        CheckReport {
            name: name.to_string(),
            outcome,
            duration_ms,
        }
    }

    fn print_summary(&self, report: &RunReport) {
        info!("");
        info!("Test summary:");
        for check in &report.checks {
            info!("  {}: {}", check.outcome.label(), check.name);
        }
        info!(
            "Total: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );
        info!(
            "Screenshots saved to {}",
            self.config.screenshot_dir.display()
        );
    }

    /// Write the run report as pretty JSON, overwriting the previous run
    pub fn write_results(&self, report: &RunReport) -> SmokeResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("smoke-results.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for SmokeRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base URL of the already-running target app
    pub base_url: String,

    /// Directory for captured screenshots
    pub screenshot_dir: PathBuf,

    /// Directory for the JSON run report
    pub output_dir: PathBuf,

    /// How long to wait for the target server before starting anyway
    pub server_wait: Duration,

    /// Page driver configuration
    pub driver: DriverConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("tests/screenshots"),
            output_dir: PathBuf::from("test-results"),
            server_wait: Duration::from_secs(30),
            driver: DriverConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(outcomes: Vec<Outcome>) -> RunReport {
        let checks = outcomes
            .into_iter()
            .enumerate()
            .map(|(i, outcome)| CheckReport {
                name: format!("check-{}", i),
                outcome,
                duration_ms: 1,
            })
            .collect();
        RunReport::new(checks, 10, Vec::new())
    }

    #[test]
    fn test_tally() {
        let report = report_with(vec![
            Outcome::Pass,
            Outcome::Fail("boom".to_string()),
            Outcome::Pass,
            Outcome::Skip,
        ]);
        assert_eq!(report.total, 4);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_skip_is_not_failure() {
        let report = report_with(vec![
            Outcome::Pass,
            Outcome::Pass,
            Outcome::Pass,
            Outcome::Skip,
        ]);
        assert!(report.success());
    }

    #[test]
    fn test_any_fail_fails_the_run() {
        let report = report_with(vec![
            Outcome::Pass,
            Outcome::Fail("no price cells".to_string()),
            Outcome::Pass,
            Outcome::Skip,
        ]);
        assert!(!report.success());
    }

    #[test]
    fn test_default_config_matches_contract_invocation() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.screenshot_dir, PathBuf::from("tests/screenshots"));
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }
}
