//! Suite runner.
//!
//! Cases run through a bounded `buffer_unordered` pool. Each case gets its
//! own browser context from one shared browser process. With fail-fast, a
//! failure stops new cases from starting; cases already in flight finish
//! and release their context.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use todo_probe::prelude::*;
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;

/// How a case ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Passed
    Passed,
    /// Failed
    Failed,
    /// Not started because of fail-fast
    Skipped,
}

/// One case's result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case id, e.g. `TC_REG_001`
    pub id: String,
    /// What the case checks
    pub description: String,
    /// Outcome
    pub status: CaseStatus,
    /// Failure message
    pub error: Option<String>,
    /// Wall time
    pub duration_ms: u64,
    /// Failure screenshot, when one was written
    pub screenshot: Option<PathBuf>,
}

impl CaseResult {
    fn new(case: RegressionCase, status: CaseStatus, duration: Duration) -> Self {
        Self {
            id: case.id().to_string(),
            description: case.description().to_string(),
            status,
            error: None,
            duration_ms: duration.as_millis() as u64,
            screenshot: None,
        }
    }
}

/// Aggregated results of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Deployment under test
    pub base_url: String,
    /// Results in suite order
    pub results: Vec<CaseResult>,
    /// Wall time of the whole run
    pub duration_ms: u64,
}

impl RunReport {
    fn count(&self, status: CaseStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Passed cases
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Passed)
    }

    /// Failed cases
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    /// Skipped cases
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    /// Cases that started
    #[must_use]
    pub fn ran(&self) -> usize {
        self.passed() + self.failed()
    }

    /// Whether every case passed and none was skipped
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.status == CaseStatus::Passed)
    }

    /// Failed results
    #[must_use]
    pub fn failures(&self) -> Vec<&CaseResult> {
        self.results
            .iter()
            .filter(|r| r.status == CaseStatus::Failed)
            .collect()
    }

    /// Pretty JSON document
    pub fn to_json(&self) -> CliResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Cases matching `filter`, in suite order
#[must_use]
pub fn select_cases(filter: Option<&str>) -> Vec<RegressionCase> {
    RegressionCase::all()
        .iter()
        .copied()
        .filter(|case| filter.map_or(true, |f| case.matches(f)))
        .collect()
}

fn suite_position(id: &str) -> usize {
    RegressionCase::all()
        .iter()
        .position(|case| case.id() == id)
        .unwrap_or(usize::MAX)
}

/// Runs regression cases and reports progress
#[derive(Debug)]
pub struct SuiteRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl SuiteRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self { config, reporter }
    }

    /// Run `cases` against a freshly launched browser
    pub async fn run(
        &mut self,
        probe: &ProbeConfig,
        cases: &[RegressionCase],
    ) -> CliResult<RunReport> {
        if let Some(dir) = &self.config.output_dir {
            tokio::fs::create_dir_all(dir).await?;
        }

        let browser = Browser::launch(probe.browser.clone()).await?;
        let screenshot_dir = self.config.output_dir.clone();
        let screenshot_dir = screenshot_dir.as_deref();
        let shared = &browser;

        let report = self
            .run_with(&probe.base_url, cases, move |case| {
                BrowserSession::run_case(shared, probe, case, screenshot_dir)
            })
            .await;

        if let Err(err) = browser.close().await {
            warn!(error = %err, "browser did not shut down cleanly");
        }
        Ok(report)
    }

    /// Run `cases` through `execute`, at most `jobs` at a time
    pub async fn run_with<F, Fut>(
        &mut self,
        base_url: &str,
        cases: &[RegressionCase],
        execute: F,
    ) -> RunReport
    where
        F: Fn(RegressionCase) -> Fut,
        Fut: Future<Output = ProbeResult<()>>,
    {
        let start = Instant::now();
        let mut report = RunReport {
            base_url: base_url.to_string(),
            ..RunReport::default()
        };

        self.reporter.header(&format!("Regression suite against {base_url}"));
        self.reporter.start_progress(cases.len() as u64, "starting");
        info!(cases = cases.len(), jobs = self.config.jobs, "suite started");

        let stop = AtomicBool::new(false);
        let stop = &stop;
        let execute = &execute;
        let mut finished = stream::iter(cases.iter().copied())
            .map(move |case| async move {
                if stop.load(Ordering::SeqCst) {
                    return (case, None, Duration::ZERO);
                }
                let started = Instant::now();
                let outcome = execute(case).await;
                (case, Some(outcome), started.elapsed())
            })
            .buffer_unordered(self.config.jobs.max(1));

        while let Some((case, outcome, elapsed)) = finished.next().await {
            let result = self.record(case, outcome, elapsed);
            if result.status == CaseStatus::Failed && self.config.fail_fast {
                stop.store(true, Ordering::SeqCst);
            }
            report.results.push(result);
            self.reporter.increment(1);
        }
        drop(finished);

        self.reporter.finish();
        report
            .results
            .sort_by_key(|result| suite_position(&result.id));
        report.duration_ms = start.elapsed().as_millis() as u64;

        self.reporter.summary(
            report.passed(),
            report.failed(),
            report.skipped(),
            Duration::from_millis(report.duration_ms),
        );
        report
    }

    fn record(
        &self,
        case: RegressionCase,
        outcome: Option<ProbeResult<()>>,
        elapsed: Duration,
    ) -> CaseResult {
        match outcome {
            None => {
                self.reporter.skipped(&case.to_string());
                CaseResult::new(case, CaseStatus::Skipped, elapsed)
            }
            Some(Ok(())) => {
                self.reporter.success(&case.to_string());
                CaseResult::new(case, CaseStatus::Passed, elapsed)
            }
            Some(Err(err)) => {
                self.reporter.failure(&format!("{case}: {err}"));
                let screenshot = self
                    .config
                    .output_dir
                    .as_ref()
                    .map(|dir| dir.join(format!("{}.png", case.id())))
                    .filter(|path| path.is_file());
                if let Some(path) = &screenshot {
                    self.reporter
                        .info(&format!("screenshot: {}", path.display()));
                }
                CaseResult {
                    error: Some(err.to_string()),
                    screenshot,
                    ..CaseResult::new(case, CaseStatus::Failed, elapsed)
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use todo_probe::fake::{FakeOptions, FakeTodoApp};

    fn quiet_config() -> CliConfig {
        CliConfig::new()
            .with_verbosity(crate::config::Verbosity::Quiet)
            .with_color(crate::config::ColorChoice::Never)
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_no_filter_selects_everything() {
            assert_eq!(select_cases(None).len(), 9);
        }

        #[test]
        fn test_filter_by_id_and_description() {
            assert_eq!(
                select_cases(Some("tc_reg_009")),
                vec![RegressionCase::EndToEnd]
            );
            let deletes = select_cases(Some("delet"));
            assert!(deletes.contains(&RegressionCase::DeleteConfirmed));
            assert!(deletes.contains(&RegressionCase::DeleteCancelled));
            assert!(select_cases(Some("no such case")).is_empty());
        }
    }

    mod report_tests {
        use super::*;

        fn report(statuses: &[CaseStatus]) -> RunReport {
            RunReport {
                base_url: "http://app.test".to_string(),
                results: RegressionCase::all()
                    .iter()
                    .zip(statuses)
                    .map(|(&case, &status)| CaseResult::new(case, status, Duration::ZERO))
                    .collect(),
                duration_ms: 0,
            }
        }

        #[test]
        fn test_counts() {
            let report = report(&[
                CaseStatus::Passed,
                CaseStatus::Failed,
                CaseStatus::Skipped,
                CaseStatus::Passed,
            ]);
            assert_eq!(report.passed(), 2);
            assert_eq!(report.failed(), 1);
            assert_eq!(report.skipped(), 1);
            assert_eq!(report.ran(), 3);
            assert!(!report.all_passed());
            assert_eq!(report.failures()[0].id, "TC_REG_002");
        }

        #[test]
        fn test_skips_are_not_a_pass() {
            assert!(!report(&[CaseStatus::Passed, CaseStatus::Skipped]).all_passed());
            assert!(report(&[CaseStatus::Passed]).all_passed());
        }

        #[test]
        fn test_json_shape() {
            let json = report(&[CaseStatus::Failed]).to_json().unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["base_url"], "http://app.test");
            assert_eq!(value["results"][0]["id"], "TC_REG_001");
            assert_eq!(value["results"][0]["status"], "failed");
        }
    }

    mod run_tests {
        use super::*;
        use todo_probe::prelude::run_case_capturing;

        #[tokio::test(start_paused = true)]
        async fn test_full_suite_on_fake_app() {
            let probe = ProbeConfig::default();
            let probe = &probe;
            let mut runner = SuiteRunner::new(quiet_config().with_jobs(3));
            let report = runner
                .run_with(&probe.base_url, &select_cases(None), move |case| async move {
                    let app = FakeTodoApp::new();
                    run_case(&app, probe, case).await
                })
                .await;
            assert_eq!(report.passed(), 9, "{report:#?}");
            assert!(report.all_passed());
            let ids: Vec<_> = report.results.iter().map(|r| r.id.as_str()).collect();
            let expected: Vec<_> = RegressionCase::all().iter().map(|c| c.id()).collect();
            assert_eq!(ids, expected);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fail_fast_sequential_skips_the_rest() {
            let probe = ProbeConfig::default();
            let probe = &probe;
            let mut runner = SuiteRunner::new(quiet_config().with_fail_fast(true));
            let report = runner
                .run_with(&probe.base_url, &select_cases(None), move |case| async move {
                    let app = FakeTodoApp::with_options(FakeOptions {
                        offline: true,
                        ..FakeOptions::default()
                    });
                    run_case(&app, probe, case).await
                })
                .await;
            assert_eq!(report.failed(), 1);
            assert_eq!(report.skipped(), 8);
            assert_eq!(report.results[0].status, CaseStatus::Failed);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fail_fast_parallel_lets_in_flight_cases_finish() {
            let probe = ProbeConfig::default();
            let probe = &probe;
            let mut runner = SuiteRunner::new(quiet_config().with_fail_fast(true).with_jobs(3));
            let report = runner
                .run_with(&probe.base_url, &select_cases(None), move |case| async move {
                    let app = FakeTodoApp::with_options(FakeOptions {
                        offline: true,
                        ..FakeOptions::default()
                    });
                    run_case(&app, probe, case).await
                })
                .await;
            assert!(report.failed() >= 1);
            assert!(report.skipped() >= 1);
            assert_eq!(report.failed() + report.skipped(), 9);
        }

        #[tokio::test(start_paused = true)]
        async fn test_without_fail_fast_every_case_runs() {
            let probe = ProbeConfig::default();
            let probe = &probe;
            let mut runner = SuiteRunner::new(quiet_config());
            let report = runner
                .run_with(&probe.base_url, &select_cases(None), move |case| async move {
                    let app = FakeTodoApp::with_options(FakeOptions {
                        offline: true,
                        ..FakeOptions::default()
                    });
                    run_case(&app, probe, case).await
                })
                .await;
            assert_eq!(report.failed(), 9);
            assert_eq!(report.skipped(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failure_records_screenshot_path() {
            let dir = tempfile::tempdir().unwrap();
            let probe = ProbeConfig::default();
            let probe = &probe;
            let shots = dir.path();
            let mut runner = SuiteRunner::new(quiet_config().with_output_dir(shots));
            let report = runner
                .run_with(
                    &probe.base_url,
                    &[RegressionCase::AddBasicTask],
                    move |case| async move {
                        let app = FakeTodoApp::with_options(FakeOptions {
                            offline: true,
                            ..FakeOptions::default()
                        });
                        run_case_capturing(&app, probe, case, Some(shots)).await
                    },
                )
                .await;
            let failures = report.failures();
            let failure = failures[0];
            assert!(failure.error.as_deref().unwrap_or_default().contains("localhost"));
            assert_eq!(failure.screenshot, Some(shots.join("TC_REG_001.png")));
        }
    }
}
