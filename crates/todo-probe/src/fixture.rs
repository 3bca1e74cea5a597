//! Per-case setup and teardown.
//!
//! Every case starts on a freshly loaded list view and ends with the
//! application's storage cleared, whatever the outcome.

use std::path::Path;
use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::pages::{TodoListPage, CLEAR_STORAGE_JS};
use crate::result::ProbeResult;
use crate::scenario::RegressionCase;

/// Setup/teardown around one case
pub struct TodoAppFixture<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a ProbeConfig,
}

impl<D: ?Sized> std::fmt::Debug for TodoAppFixture<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoAppFixture")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> TodoAppFixture<'a, D> {
    /// Fixture over `driver`
    pub const fn new(driver: &'a D, config: &'a ProbeConfig) -> Self {
        Self { driver, config }
    }

    /// Load the list view
    pub async fn setup(&self) -> ProbeResult<TodoListPage<'a, D>> {
        let list = TodoListPage::new(self.driver, self.config);
        list.navigate_to().await?;
        Ok(list)
    }

    /// Clear the application's storage and reload
    pub async fn teardown(&self) -> ProbeResult<()> {
        self.driver.evaluate(CLEAR_STORAGE_JS).await?;
        self.driver.reload().await
    }
}

/// Run `case` between setup and teardown
pub async fn run_case<D: PageDriver + ?Sized>(
    driver: &D,
    config: &ProbeConfig,
    case: RegressionCase,
) -> ProbeResult<()> {
    run_case_capturing(driver, config, case, None).await
}

/// Like [`run_case`], saving `<screenshot_dir>/<case-id>.png` when the case
/// fails. The screenshot is taken before teardown.
pub async fn run_case_capturing<D: PageDriver + ?Sized>(
    driver: &D,
    config: &ProbeConfig,
    case: RegressionCase,
    screenshot_dir: Option<&Path>,
) -> ProbeResult<()> {
    let fixture = TodoAppFixture::new(driver, config);
    let outcome = match fixture.setup().await {
        Ok(_) => case.run(driver, config).await,
        Err(err) => Err(err),
    };

    if let (Err(err), Some(dir)) = (&outcome, screenshot_dir) {
        let path = dir.join(format!("{}.png", case.id()));
        match driver.screenshot().await {
            Ok(shot) => match shot.save(&path).await {
                Ok(()) => info!(case = case.id(), path = %path.display(), "failure screenshot saved"),
                Err(save_err) => warn!(case = case.id(), error = %save_err, "cannot save screenshot"),
            },
            Err(shot_err) => warn!(case = case.id(), error = %shot_err, cause = %err, "cannot capture screenshot"),
        }
    }

    let teardown = fixture.teardown().await;
    match (outcome, teardown) {
        (Ok(()), Ok(())) => {
            info!(case = case.id(), "passed");
            Ok(())
        }
        (Ok(()), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(teardown_err)) => {
            warn!(case = case.id(), error = %teardown_err, "teardown failed after case failure");
            Err(err)
        }
    }
}

#[cfg(feature = "browser")]
pub use session::BrowserSession;

#[cfg(feature = "browser")]
mod session {
    use super::run_case_capturing;
    use crate::browser::{Browser, BrowserPage};
    use crate::config::ProbeConfig;
    use crate::driver::PageDriver;
    use crate::result::ProbeResult;
    use crate::scenario::RegressionCase;
    use std::path::Path;
    use tracing::warn;

    /// One isolated browser context and page, closed after use
    #[derive(Debug)]
    pub struct BrowserSession {
        page: BrowserPage,
    }

    impl BrowserSession {
        /// Open a fresh context and page
        pub async fn open(browser: &Browser) -> ProbeResult<Self> {
            Ok(Self {
                page: browser.new_page().await?,
            })
        }

        /// The page
        #[must_use]
        pub const fn page(&self) -> &BrowserPage {
            &self.page
        }

        /// Close the page and its context
        pub async fn close(self) -> ProbeResult<()> {
            self.page.close().await
        }

        /// Run `case` in its own session; the session is closed whatever
        /// the outcome
        pub async fn run_case(
            browser: &Browser,
            config: &ProbeConfig,
            case: RegressionCase,
            screenshot_dir: Option<&Path>,
        ) -> ProbeResult<()> {
            let session = Self::open(browser).await?;
            let outcome = run_case_capturing(session.page(), config, case, screenshot_dir).await;
            match (outcome, session.close().await) {
                (Ok(()), closed) => closed,
                (Err(err), Ok(())) => Err(err),
                (Err(err), Err(close_err)) => {
                    warn!(case = case.id(), error = %close_err, "session close failed after case failure");
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fake::{FakeOptions, FakeTodoApp};
    use crate::result::ProbeError;

    #[tokio::test(start_paused = true)]
    async fn test_teardown_clears_storage() {
        let app = FakeTodoApp::new();
        let config = ProbeConfig::default();
        run_case(&app, &config, RegressionCase::DeleteCancelled)
            .await
            .unwrap();
        assert!(app.stored_tasks().is_empty());
        assert!(app.tasks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_runs_after_failure() {
        let app = FakeTodoApp::with_options(FakeOptions {
            stuck_delete: true,
            ..FakeOptions::default()
        });
        let config = ProbeConfig::default();
        let err = run_case(&app, &config, RegressionCase::DeleteConfirmed)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(app.stored_tasks().is_empty());
        assert_eq!(app.history().last().map(String::as_str), Some("reload"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_screenshot_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let app = FakeTodoApp::with_options(FakeOptions {
            offline: true,
            ..FakeOptions::default()
        });
        let config = ProbeConfig::default();
        let err = run_case_capturing(&app, &config, RegressionCase::AddBasicTask, Some(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Navigation { .. }));
        let shot = dir.path().join("TC_REG_001.png");
        let bytes = std::fs::read(shot).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_screenshot_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let app = FakeTodoApp::new();
        let config = ProbeConfig::default();
        run_case_capturing(&app, &config, RegressionCase::NameRequired, Some(dir.path()))
            .await
            .unwrap();
        assert!(!app.was_called("screenshot"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
