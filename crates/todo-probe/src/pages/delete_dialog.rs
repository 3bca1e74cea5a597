//! Delete-confirmation dialog.
//!
//! closed → (delete chosen from a task menu) → open → (confirm | cancel) → closed

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::settle_on;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::expect::expect;
use crate::locator::Locator;
use crate::page_object::{PageObject, UrlPattern};
use crate::registry::DeleteDialogLocators;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::first_match;

/// The modal asking whether a task should really be deleted
pub struct DeleteTaskDialog<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a ProbeConfig,
    locators: DeleteDialogLocators,
}

impl<D: ?Sized> fmt::Debug for DeleteTaskDialog<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteTaskDialog")
            .field("alternatives", &self.locators.alternatives.len())
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> DeleteTaskDialog<'a, D> {
    /// Dialog object over `driver`
    pub fn new(driver: &'a D, config: &'a ProbeConfig) -> Self {
        Self {
            driver,
            config,
            locators: DeleteDialogLocators::new(),
        }
    }

    /// Locators in use
    pub const fn locators(&self) -> &DeleteDialogLocators {
        &self.locators
    }

    /// Wait until one of the alternative locators shows the dialog.
    ///
    /// Each alternative gets an equal share of `timeout_ms`. Returns the index
    /// of the alternative that matched, or [`ProbeError::DialogNotFound`].
    pub async fn wait_until_visible(&self, timeout_ms: u64) -> ProbeResult<usize> {
        let driver = self.driver;
        let alternatives = &self.locators.alternatives;
        let found = first_match(
            alternatives,
            Duration::from_millis(timeout_ms),
            move |locator, share| async move {
                expect(driver, locator)
                    .within(share.as_millis() as u64)
                    .to_be_visible()
                    .await
            },
        )
        .await;

        match found {
            Ok(index) => {
                debug!(strategy = %alternatives[index], "delete dialog visible");
                Ok(index)
            }
            Err(_) => Err(ProbeError::DialogNotFound {
                tried: alternatives
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Whether any alternative currently shows the dialog
    pub async fn is_visible(&self) -> ProbeResult<bool> {
        for locator in &self.locators.alternatives {
            if self.driver.is_visible(locator).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Confirm the deletion and wait for the dialog to close
    pub async fn confirm(&self) -> ProbeResult<()> {
        self.answer(&self.locators.confirm_button, "confirm").await
    }

    /// Cancel the deletion and wait for the dialog to close
    pub async fn cancel(&self) -> ProbeResult<()> {
        self.answer(&self.locators.cancel_button, "cancel").await
    }

    async fn answer(&self, button: &Locator, choice: &str) -> ProbeResult<()> {
        let shown = self.wait_until_visible(self.config.timeouts.dialog_ms).await?;
        settle_on(
            self.driver,
            &self.locators.alternatives[shown],
            self.config.settle.dialog_ms,
        )
        .await;

        debug!(choice, "answering delete dialog");
        self.driver.click(button).await?;

        // An alternative that never matched counts as hidden straight away.
        let driver = self.driver;
        let hide_ms = self.config.timeouts.dialog_hide_ms;
        let alternatives = &self.locators.alternatives;
        let budget = Duration::from_millis(hide_ms) * alternatives.len() as u32;
        first_match(alternatives, budget, move |locator, share| async move {
            expect(driver, locator)
                .within(share.as_millis() as u64)
                .to_be_hidden()
                .await
        })
        .await
        .map(|_| ())
        .map_err(|_| ProbeError::timeout("delete confirmation dialog to close", hide_ms))
    }
}

#[async_trait]
impl<D: PageDriver + ?Sized> PageObject for DeleteTaskDialog<'_, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("**/")
    }

    async fn is_loaded(&self) -> ProbeResult<bool> {
        self.is_visible().await
    }

    fn load_timeout_ms(&self) -> u64 {
        self.config.timeouts.dialog_ms
    }

    fn page_name(&self) -> &'static str {
        "DeleteTaskDialog"
    }
}
