//! Add-task screen (`/add`).

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt;
use tracing::debug;

use super::settle_list;
use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::expect::expect;
use crate::page_object::{PageObject, UrlPattern};
use crate::registry::AddTaskLocators;
use crate::result::{ProbeError, ProbeResult};
use crate::task::{format_deadline, TaskSpec};
use crate::wait::wait_for_url;

/// Page object for the task creation form
pub struct AddTaskPage<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a ProbeConfig,
    locators: AddTaskLocators,
}

impl<D: ?Sized> fmt::Debug for AddTaskPage<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddTaskPage")
            .field("url", &self.config.add_task_url())
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> AddTaskPage<'a, D> {
    /// Page object over `driver`
    pub fn new(driver: &'a D, config: &'a ProbeConfig) -> Self {
        Self {
            driver,
            config,
            locators: AddTaskLocators::new(),
        }
    }

    /// Locators in use
    pub const fn locators(&self) -> &AddTaskLocators {
        &self.locators
    }

    /// Load `/add` and wait for the heading and the name input
    pub async fn navigate_to(&self) -> ProbeResult<()> {
        let url = self.config.add_task_url();
        debug!(%url, "opening add-task screen");
        self.driver.goto(&url).await?;

        let t = &self.config.timeouts;
        let ready = async {
            expect(self.driver, &self.locators.heading)
                .within(t.add_page_heading_ms)
                .to_be_visible()
                .await?;
            expect(self.driver, &self.locators.name_input)
                .within(t.add_page_input_ms)
                .to_be_visible()
                .await
        };
        ready.await.map_err(|err| ProbeError::Navigation {
            url,
            message: err.to_string(),
        })
    }

    /// Type the task name
    pub async fn fill_name(&self, name: &str) -> ProbeResult<()> {
        self.driver.fill(&self.locators.name_input, name).await
    }

    /// Type the description
    pub async fn fill_description(&self, description: &str) -> ProbeResult<()> {
        self.driver
            .fill(&self.locators.description_input, description)
            .await
    }

    /// Set the deadline input
    pub async fn set_deadline(&self, deadline: &NaiveDateTime) -> ProbeResult<()> {
        self.driver
            .fill(&self.locators.deadline_input, &format_deadline(deadline))
            .await
    }

    /// Pick the colour swatch at `index`, expanding the picker first if needed
    pub async fn select_color(&self, index: usize) -> ProbeResult<()> {
        if !self.driver.is_visible(&self.locators.color_grid).await? {
            debug!("expanding colour picker");
            self.driver.click(&self.locators.color_accordion).await?;
            expect(self.driver, &self.locators.color_grid)
                .within(self.config.timeouts.expect_ms)
                .to_be_visible()
                .await?;
        }

        let available = self.driver.count(&self.locators.color_swatches).await?;
        if index >= available {
            return Err(ProbeError::Input {
                message: format!("colour index {index} out of range ({available} swatches)"),
            });
        }
        self.driver.click(&self.locators.color_swatch(index)).await
    }

    /// Create the task and wait to land back on the list
    pub async fn submit(&self) -> ProbeResult<()> {
        debug!("submitting task");
        self.driver.click(&self.locators.create_button).await?;
        wait_for_url(
            self.driver,
            &UrlPattern::glob("**/"),
            self.config.timeouts.navigation_ms,
        )
        .await?;
        settle_list(self.driver, &self.config.settle, self.config.settle.submit_ms).await;
        Ok(())
    }

    /// Fill every provided field, pick a colour (swatch 0 unless given) and submit
    pub async fn add_complete_task(&self, task: &TaskSpec) -> ProbeResult<()> {
        debug!(title = %task.title, "adding task");
        self.fill_name(&task.title).await?;
        if let Some(description) = &task.description {
            self.fill_description(description).await?;
        }
        if let Some(deadline) = &task.deadline {
            self.set_deadline(deadline).await?;
        }
        self.select_color(task.color_index.unwrap_or(0)).await?;
        self.submit().await
    }

    /// Submit with an empty name and expect the input to be flagged invalid
    pub async fn expect_name_required_error(&self) -> ProbeResult<()> {
        self.driver.click(&self.locators.create_button).await?;
        expect(self.driver, &self.locators.name_input)
            .within(self.config.timeouts.expect_ms)
            .to_have_attribute("aria-invalid", "true")
            .await
    }

    /// The form is still on screen
    pub async fn expect_on_add_task_page(&self) -> ProbeResult<()> {
        let within = self.config.timeouts.expect_ms;
        expect(self.driver, &self.locators.heading)
            .within(within)
            .to_be_visible()
            .await?;
        expect(self.driver, &self.locators.create_button)
            .within(within)
            .to_be_visible()
            .await
    }

    /// Leave through the back button
    pub async fn go_back(&self) -> ProbeResult<()> {
        self.driver.click(&self.locators.back_button).await?;
        wait_for_url(
            self.driver,
            &UrlPattern::glob("**/"),
            self.config.timeouts.navigation_ms,
        )
        .await
    }
}

#[async_trait]
impl<D: PageDriver + ?Sized> PageObject for AddTaskPage<'_, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("**/add")
    }

    async fn is_loaded(&self) -> ProbeResult<bool> {
        self.driver.is_visible(&self.locators.heading).await
    }

    fn load_timeout_ms(&self) -> u64 {
        self.config.timeouts.add_page_heading_ms
    }

    fn page_name(&self) -> &'static str {
        "AddTaskPage"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fake::{FakeOptions, FakeTodoApp};
    use chrono::NaiveDate;

    async fn on_add_page(app: &FakeTodoApp, config: &ProbeConfig) {
        AddTaskPage::new(app, config).navigate_to().await.unwrap();
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_and_is_loaded() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            let page = AddTaskPage::new(&app, &config);
            page.navigate_to().await.unwrap();
            assert!(page.is_loaded().await.unwrap());
            assert!(page
                .url_pattern()
                .matches(&app.current_url().await.unwrap()));
            page.expect_on_add_task_page().await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_offline_is_navigation_error() {
            let app = FakeTodoApp::with_options(FakeOptions {
                offline: true,
                ..FakeOptions::default()
            });
            let config = ProbeConfig::default();
            let err = AddTaskPage::new(&app, &config).navigate_to().await.unwrap_err();
            assert!(matches!(err, ProbeError::Navigation { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_go_back_returns_to_list() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            AddTaskPage::new(&app, &config).go_back().await.unwrap();
            assert_eq!(app.current_url().await.unwrap(), config.list_url());
        }
    }

    mod form_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_add_complete_task_fills_every_field() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            let deadline = NaiveDate::from_ymd_opt(2030, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap();
            let task = TaskSpec::new("Pay rent")
                .with_description("before the 5th")
                .with_deadline(deadline)
                .with_color(3);
            AddTaskPage::new(&app, &config)
                .add_complete_task(&task)
                .await
                .unwrap();

            let stored = app.tasks();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].title, "Pay rent");
            assert_eq!(stored[0].description.as_deref(), Some("before the 5th"));
            assert_eq!(stored[0].deadline.as_deref(), Some("2030-01-02T09:30"));
            assert_eq!(stored[0].color, Some(3));
            assert_eq!(app.current_url().await.unwrap(), config.list_url());
        }

        #[tokio::test(start_paused = true)]
        async fn test_optional_fields_are_skipped() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            AddTaskPage::new(&app, &config)
                .add_complete_task(&TaskSpec::new("Just a title"))
                .await
                .unwrap();
            let stored = app.tasks();
            assert_eq!(stored[0].description, None);
            assert_eq!(stored[0].deadline, None);
            assert_eq!(stored[0].color, Some(0));
            assert!(!app.history().iter().any(|c| c.contains("textarea")));
        }

        #[tokio::test(start_paused = true)]
        async fn test_select_color_expands_picker_once() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            let page = AddTaskPage::new(&app, &config);
            page.select_color(1).await.unwrap();
            page.select_color(4).await.unwrap();
            let accordion_clicks = app
                .history()
                .iter()
                .filter(|c| c.contains("MuiAccordionSummary"))
                .count();
            assert_eq!(accordion_clicks, 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_select_color_out_of_range() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            let err = AddTaskPage::new(&app, &config)
                .select_color(42)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Input { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_name_required_error() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            on_add_page(&app, &config).await;
            let page = AddTaskPage::new(&app, &config);
            page.expect_name_required_error().await.unwrap();
            page.expect_on_add_task_page().await.unwrap();
            assert!(app.tasks().is_empty());
        }
    }
}
