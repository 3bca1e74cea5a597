//! Auto-retrying assertions.
//!
//! ```ignore
//! expect(driver, &locators.task_menu).within(5_000).to_be_visible().await?;
//! expect(driver, &title).to_have_text("Buy milk").await?;
//! ```
//!
//! Presence assertions (`to_be_visible`, `to_be_hidden`, `to_be_settled`) fail
//! with [`ProbeError::Timeout`]. Value assertions fail with
//! [`ProbeError::AssertionFailed`] carrying the last observed value.

use std::sync::Mutex;

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{wait_until, WaitOptions, DEFAULT_WAIT_TIMEOUT_MS};

/// Collapse whitespace runs and trim, as rendered text is compared
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Start an assertion on `locator`
pub fn expect<'a, D: PageDriver + ?Sized>(driver: &'a D, locator: &'a Locator) -> Expect<'a, D> {
    Expect {
        driver,
        locator,
        options: WaitOptions::timeout_ms(DEFAULT_WAIT_TIMEOUT_MS),
    }
}

/// Pending assertion on a locator
#[derive(Debug)]
pub struct Expect<'a, D: ?Sized> {
    driver: &'a D,
    locator: &'a Locator,
    options: WaitOptions,
}

impl<'a, D: PageDriver + ?Sized> Expect<'a, D> {
    /// Override the budget
    #[must_use]
    pub const fn within(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = timeout_ms;
        self
    }

    /// Override all polling options
    #[must_use]
    pub const fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Some match is visible
    pub async fn to_be_visible(self) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        wait_until(
            &format!("{locator} to be visible"),
            &self.options,
            move || async move { driver.is_visible(locator).await },
        )
        .await
    }

    /// No match is visible (including no match at all)
    pub async fn to_be_hidden(self) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        wait_until(
            &format!("{locator} to be hidden"),
            &self.options,
            move || async move { Ok(!driver.is_visible(locator).await?) },
        )
        .await
    }

    /// The target is visible and its animations have finished
    pub async fn to_be_settled(self) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        wait_until(
            &format!("{locator} to settle"),
            &self.options,
            move || async move { driver.is_settled(locator).await },
        )
        .await
    }

    /// Exactly `expected` matches
    pub async fn to_have_count(self, expected: usize) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        self.assert_value(format!("{locator} to have count {expected}"), move || async move {
            let count = driver.count(locator).await?;
            Ok((count == expected, count.to_string()))
        })
        .await
    }

    /// Target text equals `expected` after whitespace normalisation
    pub async fn to_have_text(self, expected: &str) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        let wanted = normalize_text(expected);
        let wanted = wanted.as_str();
        self.assert_value(format!("{locator} to have text {expected:?}"), move || async move {
            let text = driver.text_content(locator).await?;
            let observed = text.as_deref().map(normalize_text);
            Ok((observed.as_deref() == Some(wanted), format!("{observed:?}")))
        })
        .await
    }

    /// Target text contains `expected`
    pub async fn to_contain_text(self, expected: &str) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        let wanted = normalize_text(expected);
        let wanted = wanted.as_str();
        self.assert_value(
            format!("{locator} to contain text {expected:?}"),
            move || async move {
                let text = driver.text_content(locator).await?;
                let observed = text.as_deref().map(normalize_text);
                let ok = observed.as_deref().is_some_and(|t| t.contains(wanted));
                Ok((ok, format!("{observed:?}")))
            },
        )
        .await
    }

    /// Target attribute `name` equals `expected`
    pub async fn to_have_attribute(self, name: &str, expected: &str) -> ProbeResult<()> {
        let (driver, locator) = (self.driver, self.locator);
        self.assert_value(
            format!("{locator} to have {name}={expected:?}"),
            move || async move {
                let value = driver.attribute(locator, name).await?;
                Ok((value.as_deref() == Some(expected), format!("{value:?}")))
            },
        )
        .await
    }

    async fn assert_value<F, Fut>(&self, what: String, mut observe: F) -> ProbeResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ProbeResult<(bool, String)>>,
    {
        let last_seen = Mutex::new(None::<String>);
        let last_seen_ref = &last_seen;
        let result = wait_until(&what, &self.options, move || {
            let fut = observe();
            async move {
                let (ok, observed) = fut.await?;
                if let Ok(mut slot) = last_seen_ref.lock() {
                    *slot = Some(observed);
                }
                Ok(ok)
            }
        })
        .await;

        match result {
            Err(ProbeError::Timeout { ms, last_error, .. }) => {
                let observed = last_seen.lock().ok().and_then(|mut slot| slot.take());
                let detail = match (observed, last_error) {
                    (Some(value), _) => format!("last observed {value}"),
                    (None, Some(err)) => format!("last error: {err}"),
                    (None, None) => "nothing observed".to_string(),
                };
                Err(ProbeError::assertion(format!(
                    "expected {what} within {ms}ms, {detail}"
                )))
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fake::FakeTodoApp;
    use crate::registry::ListLocators;

    mod normalize_tests {
        use super::*;

        #[test]
        fn test_normalize_collapses_whitespace() {
            assert_eq!(normalize_text("  Buy\n  milk \t now "), "Buy milk now");
            assert_eq!(normalize_text(""), "");
        }
    }

    mod assertion_tests {
        use super::*;

        async fn app_with_task(title: &str) -> FakeTodoApp {
            let app = FakeTodoApp::new();
            app.seed_task(title, Some("details"));
            app.goto("http://localhost:5173/").await.unwrap();
            app
        }

        #[tokio::test(start_paused = true)]
        async fn test_visible_and_hidden() {
            let app = app_with_task("Buy milk").await;
            let list = ListLocators::new();
            let card = list.task_container("Buy milk");
            expect(&app, &card).to_be_visible().await.unwrap();
            let missing = list.task_container("Walk dog");
            expect(&app, &missing).within(200).to_be_hidden().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_visible_timeout_is_timeout_error() {
            let app = app_with_task("Buy milk").await;
            let missing = ListLocators::new().task_container("Walk dog");
            let err = expect(&app, &missing).within(300).to_be_visible().await.unwrap_err();
            assert!(err.is_timeout());
        }

        #[tokio::test(start_paused = true)]
        async fn test_count_mismatch_is_assertion_with_observation() {
            let app = app_with_task("Buy milk").await;
            let list = ListLocators::new();
            let err = expect(&app, &list.task_containers)
                .within(200)
                .to_have_count(2)
                .await
                .unwrap_err();
            match err {
                ProbeError::AssertionFailed { message } => {
                    assert!(message.contains("last observed 1"), "{message}");
                }
                other => panic!("expected assertion failure, got {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_assertions() {
            let app = app_with_task("Buy milk").await;
            let list = ListLocators::new();
            let title = list.task_container("Buy milk").locator(&list.task_title);
            expect(&app, &title).to_have_text("Buy milk").await.unwrap();
            expect(&app, &title).to_contain_text("milk").await.unwrap();
            let err = expect(&app, &title).within(100).to_have_text("Buy").await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_attribute_assertion() {
            let app = app_with_task("Buy milk").await;
            let list = ListLocators::new();
            expect(&app, &list.search_input)
                .to_have_attribute("placeholder", "Search for task...")
                .await
                .unwrap();
        }
    }
}
