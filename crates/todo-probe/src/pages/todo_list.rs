//! Main task list screen (`/`).

use async_trait::async_trait;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{
    settle_list, settle_list_after_change, settle_on, AddTaskPage, DeleteTaskDialog,
    CLEAR_STORAGE_JS,
};
use crate::config::ProbeConfig;
use crate::driver::{Key, PageDriver};
use crate::expect::{expect, normalize_text};
use crate::locator::Locator;
use crate::page_object::{PageObject, UrlPattern};
use crate::registry::ListLocators;
use crate::result::{ProbeError, ProbeResult};
use crate::task::{parse_task_count, ActionOutcome, TaskCount, TaskSpec};
use crate::wait::{wait_for_url, wait_until, WaitOptions};

/// Page object for the task list
pub struct TodoListPage<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a ProbeConfig,
    locators: ListLocators,
    dialog: DeleteTaskDialog<'a, D>,
}

impl<D: ?Sized> fmt::Debug for TodoListPage<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoListPage")
            .field("url", &self.config.list_url())
            .finish_non_exhaustive()
    }
}

impl<'a, D: PageDriver + ?Sized> TodoListPage<'a, D> {
    /// Page object over `driver`
    pub fn new(driver: &'a D, config: &'a ProbeConfig) -> Self {
        Self {
            driver,
            config,
            locators: ListLocators::new(),
            dialog: DeleteTaskDialog::new(driver, config),
        }
    }

    /// Locators in use
    pub const fn locators(&self) -> &ListLocators {
        &self.locators
    }

    /// The delete-confirmation dialog this screen opens
    pub const fn delete_dialog(&self) -> &DeleteTaskDialog<'a, D> {
        &self.dialog
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Load the list and wait for the add affordance
    pub async fn navigate_to(&self) -> ProbeResult<()> {
        let url = self.config.list_url();
        debug!(%url, "opening task list");
        self.driver.goto(&url).await?;
        expect(self.driver, &self.locators.add_task_button)
            .within(self.config.timeouts.navigation_ms)
            .to_be_visible()
            .await
            .map_err(|err| ProbeError::Navigation {
                url,
                message: err.to_string(),
            })
    }

    /// Open the add-task screen through the add affordance
    pub async fn open_add_task_page(&self) -> ProbeResult<AddTaskPage<'a, D>> {
        debug!("opening add-task screen");
        // The floating button sits under a tooltip; skip pointer hit-testing.
        self.driver
            .dispatch_click(&self.locators.add_task_button)
            .await?;
        wait_for_url(
            self.driver,
            &UrlPattern::glob("**/add"),
            self.config.timeouts.navigation_ms,
        )
        .await?;

        let page = AddTaskPage::new(self.driver, self.config);
        expect(self.driver, &page.locators().heading)
            .within(self.config.timeouts.add_page_input_ms)
            .to_be_visible()
            .await?;
        Ok(page)
    }

    /// Reset the application: clear storage, reload, wait for the list
    pub async fn reset_state(&self) -> ProbeResult<()> {
        debug!("resetting application state");
        self.driver.evaluate(CLEAR_STORAGE_JS).await?;
        self.driver.reload().await?;

        let t = &self.config.timeouts;
        expect(self.driver, &self.locators.add_task_button)
            .within(t.reload_ms)
            .to_be_visible()
            .await?;
        let indicator = self.count_indicator();
        expect(self.driver, &indicator)
            .within(t.reset_indicator_ms)
            .to_be_visible()
            .await?;
        settle_list(self.driver, &self.config.settle, self.config.settle.reset_ms).await;
        Ok(())
    }

    // =========================================================================
    // TASK OPERATIONS
    // =========================================================================

    /// Containers whose text includes `title`.
    ///
    /// Matching is by substring: callers must use titles that do not contain
    /// one another.
    pub fn find_task(&self, title: &str) -> Locator {
        self.locators.task_container(title)
    }

    /// Create a task through the add-task screen and wait for it on the list
    pub async fn add_task(&self, task: &TaskSpec) -> ProbeResult<()> {
        let page = self.open_add_task_page().await?;
        page.add_complete_task(task).await?;
        expect(self.driver, &self.find_task(&task.title))
            .within(self.config.timeouts.task_visible_ms)
            .to_be_visible()
            .await
    }

    /// Create several tasks in order
    pub async fn add_tasks(&self, tasks: &[TaskSpec]) -> ProbeResult<()> {
        for task in tasks {
            self.add_task(task).await?;
        }
        Ok(())
    }

    /// Open the menu of the task titled `title`
    pub async fn open_task_menu(&self, title: &str) -> ProbeResult<()> {
        debug!(title, "opening task menu");
        let button = self.find_task(title).locator(&self.locators.task_menu_button);
        self.driver.click(&button).await?;
        expect(self.driver, &self.locators.task_menu)
            .within(self.config.timeouts.expect_ms)
            .to_be_visible()
            .await?;
        settle_on(
            self.driver,
            &self.locators.task_menu,
            self.config.settle.menu_ms,
        )
        .await;
        Ok(())
    }

    /// Mark a task done. A task that is already done is left alone.
    pub async fn complete_task(&self, title: &str) -> ProbeResult<ActionOutcome> {
        self.set_completion(title, true).await
    }

    /// Mark a task not done. A pending task is left alone.
    pub async fn uncomplete_task(&self, title: &str) -> ProbeResult<ActionOutcome> {
        self.set_completion(title, false).await
    }

    async fn set_completion(&self, title: &str, done: bool) -> ProbeResult<ActionOutcome> {
        let within = self.config.timeouts.expect_ms;
        self.open_task_menu(title).await?;

        let (entry, label) = if done {
            (&self.locators.menu_complete, "Complete")
        } else {
            (&self.locators.menu_pending, "Pending")
        };

        if !self.driver.is_visible(entry).await? {
            warn!(title, entry = label, "menu entry absent, task already in requested state");
            self.driver.press_key(Key::Escape).await?;
            expect(self.driver, &self.locators.task_menu)
                .within(within)
                .to_be_hidden()
                .await?;
            return Ok(ActionOutcome::AlreadySatisfied);
        }

        debug!(title, entry = label, "toggling completion");
        self.driver.click(entry).await?;
        expect(self.driver, &self.locators.task_menu)
            .within(within)
            .to_be_hidden()
            .await?;
        let icon = self.find_task(title).locator(&self.locators.completed_icon);
        let check = expect(self.driver, &icon).within(within);
        if done {
            check.to_be_visible().await?;
        } else {
            check.to_be_hidden().await?;
        }
        Ok(ActionOutcome::Performed)
    }

    /// Delete a task, answering the confirmation dialog with `confirm`.
    ///
    /// A task that is not on screen is treated as already deleted.
    pub async fn delete_task(&self, title: &str, confirm: bool) -> ProbeResult<ActionOutcome> {
        let task = self.find_task(title);
        if !self.driver.is_visible(&task).await? {
            warn!(title, "task not present, nothing to delete");
            return Ok(ActionOutcome::AlreadySatisfied);
        }

        let settle = &self.config.settle;
        settle_list(self.driver, settle, settle.pre_delete_ms).await;
        self.open_task_menu(title).await?;
        settle_on(self.driver, &self.locators.task_menu, settle.pre_delete_ms).await;
        debug!(title, confirm, "deleting task");
        self.driver.click(&self.locators.menu_delete).await?;

        let t = &self.config.timeouts;
        if confirm {
            self.dialog.confirm().await?;
            expect(self.driver, &task)
                .within(t.delete_hidden_ms)
                .to_be_hidden()
                .await?;
        } else {
            self.dialog.cancel().await?;
            expect(self.driver, &task)
                .within(t.expect_ms)
                .to_be_visible()
                .await?;
        }
        Ok(ActionOutcome::Performed)
    }

    /// Delete tasks one by one through the UI until none is left.
    ///
    /// Stops early if a deletion does not reduce the number of tasks, then
    /// asserts the list is empty. Returns how many tasks were deleted.
    pub async fn delete_all_via_ui(&self) -> ProbeResult<usize> {
        let containers = &self.locators.task_containers;
        let first_title = containers.clone().first().locator(&self.locators.task_title);
        let mut deleted = 0;

        loop {
            let before = self.driver.count(containers).await?;
            if before == 0 {
                break;
            }
            expect(self.driver, &first_title)
                .within(self.config.timeouts.delete_all_title_ms)
                .to_be_visible()
                .await?;
            let title = self
                .driver
                .text_content(&first_title)
                .await?
                .map(|t| normalize_text(&t))
                .unwrap_or_default();
            if title.is_empty() {
                warn!(remaining = before, "first task has no title, giving up");
                break;
            }

            self.delete_task(&title, true).await?;
            settle_list(self.driver, &self.config.settle, self.config.settle.delete_all_ms).await;

            let after = self.driver.count(containers).await?;
            if after >= before {
                warn!(%title, before, after, "deletion made no progress, giving up");
                break;
            }
            deleted += before - after;
        }

        self.expect_no_tasks().await?;
        Ok(deleted)
    }

    /// Type into the search box and let the filter apply.
    ///
    /// The filter may apply late, so the list is awaited until it moves off
    /// its pre-search contents, falling back to the full search budget.
    pub async fn search_tasks(&self, term: &str) -> ProbeResult<()> {
        debug!(term, "searching");
        let before = self.driver.all_text_contents(&self.locators.task_containers).await?;
        self.driver.fill(&self.locators.search_input, term).await?;
        let settle = &self.config.settle;
        settle_list_after_change(self.driver, settle, settle.search_ms, &before).await;
        Ok(())
    }

    /// Empty the search box
    pub async fn clear_search(&self) -> ProbeResult<()> {
        self.search_tasks("").await
    }

    /// Delete every task through the sidebar's purge action
    pub async fn purge_all_tasks(&self) -> ProbeResult<()> {
        let t = &self.config.timeouts;
        let l = &self.locators;
        debug!("purging all tasks");

        self.driver.click(&l.sidebar_button).await?;
        expect(self.driver, &l.sidebar_drawer)
            .within(t.expect_ms)
            .to_be_visible()
            .await?;

        self.driver.click(&l.purge_link).await?;
        expect(self.driver, &l.purge_dialog)
            .within(t.dialog_ms)
            .to_be_visible()
            .await?;

        self.driver.click(&l.purge_confirm_button).await?;
        expect(self.driver, &l.purge_dialog)
            .within(t.dialog_hide_ms)
            .to_be_hidden()
            .await?;
        expect(self.driver, &l.task_containers)
            .within(t.purge_ms)
            .to_have_count(0)
            .await?;

        self.driver.press_key(Key::Escape).await?;
        expect(self.driver, &l.sidebar_drawer)
            .within(t.sidebar_hide_ms)
            .to_be_hidden()
            .await
    }

    // =========================================================================
    // COUNTING
    // =========================================================================

    fn count_indicator(&self) -> Locator {
        self.locators
            .task_count_header
            .clone()
            .or(self.locators.empty_state.clone())
    }

    /// Count shown by the list: the header's number, 0 for the empty state,
    /// [`TaskCount::Unknown`] when neither is on screen
    pub async fn get_task_count(&self) -> ProbeResult<TaskCount> {
        let header = &self.locators.task_count_header;
        if self.driver.is_visible(header).await? {
            if let Some(n) = self
                .driver
                .text_content(header)
                .await?
                .as_deref()
                .and_then(parse_task_count)
            {
                return Ok(TaskCount::Known(n));
            }
        }
        if self.driver.is_visible(&self.locators.empty_state).await? {
            return Ok(TaskCount::Known(0));
        }
        Ok(TaskCount::Unknown)
    }

    /// Wait for the displayed count to equal `expected`.
    ///
    /// An unknown count is retried; it becomes [`ProbeError::AmbiguousState`]
    /// only if it is still unknown when the budget runs out.
    pub async fn expect_task_count(&self, expected: usize) -> ProbeResult<()> {
        let ms = self.config.timeouts.count_ms;
        let what = format!("task count {expected}");
        let last = Mutex::new(None::<TaskCount>);
        let last_ref = &last;
        let this = self;

        let result = wait_until(&what, &WaitOptions::timeout_ms(ms), move || async move {
            let count = this.get_task_count().await?;
            if let Ok(mut slot) = last_ref.lock() {
                *slot = Some(count);
            }
            Ok(count == TaskCount::Known(expected))
        })
        .await;

        let observed = last.lock().ok().and_then(|slot| *slot);
        match (result, observed) {
            (Err(ProbeError::Timeout { .. }), Some(TaskCount::Unknown)) => {
                Err(ProbeError::AmbiguousState {
                    message: format!(
                        "task count could not be derived from the header or the empty state within {ms}ms"
                    ),
                })
            }
            (Err(ProbeError::Timeout { .. }), Some(TaskCount::Known(seen))) => Err(
                ProbeError::assertion(format!(
                    "expected task count {expected} within {ms}ms, last observed {seen}"
                )),
            ),
            (result, _) => result,
        }
    }

    /// Exactly `expected` task cards are rendered
    pub async fn expect_total_task_cards(&self, expected: usize) -> ProbeResult<()> {
        expect(self.driver, &self.locators.task_containers)
            .within(self.config.timeouts.count_ms)
            .to_have_count(expected)
            .await
    }

    /// No task cards, and the list reports zero tasks
    pub async fn expect_no_tasks(&self) -> ProbeResult<()> {
        self.expect_total_task_cards(0).await?;
        self.expect_task_count(0).await
    }

    /// Number of visible task cards right now
    pub async fn visible_task_count(&self) -> ProbeResult<usize> {
        self.driver
            .count(&self.locators.task_containers.clone().visible())
            .await
    }

    /// Titles of the visible task cards, in list order
    pub async fn visible_task_titles(&self) -> ProbeResult<Vec<String>> {
        let titles = self
            .locators
            .task_containers
            .clone()
            .visible()
            .locator(&self.locators.task_title);
        let texts = self.driver.all_text_contents(&titles).await?;
        Ok(texts.iter().map(|t| normalize_text(t)).collect())
    }

    // =========================================================================
    // ASSERTIONS
    // =========================================================================

    /// The task is on screen with exactly this title, and the description if given
    pub async fn expect_task_visible(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> ProbeResult<()> {
        let t = &self.config.timeouts;
        let task = self.find_task(title);
        expect(self.driver, &task)
            .within(t.task_visible_ms)
            .to_be_visible()
            .await?;
        expect(self.driver, &task.locator(&self.locators.task_title))
            .within(t.expect_ms)
            .to_have_text(title)
            .await?;
        if let Some(description) = description {
            expect(self.driver, &task.locator(&self.locators.task_description))
                .within(t.expect_ms)
                .to_contain_text(description)
                .await?;
        }
        Ok(())
    }

    /// The task is not on screen
    pub async fn expect_task_hidden(&self, title: &str) -> ProbeResult<()> {
        expect(self.driver, &self.find_task(title))
            .within(self.config.timeouts.expect_ms)
            .to_be_hidden()
            .await
    }

    /// The completion icon of the task is shown iff `completed`
    pub async fn expect_task_completed(&self, title: &str, completed: bool) -> ProbeResult<()> {
        let icon = self.find_task(title).locator(&self.locators.completed_icon);
        let check = expect(self.driver, &icon).within(self.config.timeouts.expect_ms);
        if completed {
            check.to_be_visible().await
        } else {
            check.to_be_hidden().await
        }
    }

    /// The list holds exactly `tasks`, each with its details and, when given,
    /// the completion state at the same index
    pub async fn expect_task_list_to_contain(
        &self,
        tasks: &[TaskSpec],
        completion: Option<&[bool]>,
    ) -> ProbeResult<()> {
        self.expect_total_task_cards(tasks.len()).await?;
        for (index, task) in tasks.iter().enumerate() {
            self.expect_task_visible(&task.title, task.description.as_deref())
                .await?;
            if let Some(&done) = completion.and_then(|states| states.get(index)) {
                self.expect_task_completed(&task.title, done).await?;
            }
        }
        Ok(())
    }

    /// The search box shows `placeholder`
    pub async fn expect_search_placeholder(&self, placeholder: &str) -> ProbeResult<()> {
        expect(self.driver, &self.locators.search_input)
            .within(self.config.timeouts.expect_ms)
            .to_have_attribute("placeholder", placeholder)
            .await
    }
}

#[async_trait]
impl<D: PageDriver + ?Sized> PageObject for TodoListPage<'_, D> {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::glob("**/")
    }

    async fn is_loaded(&self) -> ProbeResult<bool> {
        self.driver.is_visible(&self.locators.add_task_button).await
    }

    fn load_timeout_ms(&self) -> u64 {
        self.config.timeouts.navigation_ms
    }

    fn page_name(&self) -> &'static str {
        "TodoListPage"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fake::{FakeOptions, FakeTodoApp};

    async fn loaded(app: &FakeTodoApp, config: &ProbeConfig) {
        TodoListPage::new(app, config).navigate_to().await.unwrap();
    }

    fn seeded(titles: &[&str]) -> FakeTodoApp {
        seeded_with(FakeOptions::default(), titles)
    }

    fn seeded_with(options: FakeOptions, titles: &[&str]) -> FakeTodoApp {
        let app = FakeTodoApp::with_options(options);
        for title in titles {
            app.seed_task(title, None);
        }
        app
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_to_list() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            let page = TodoListPage::new(&app, &config);
            page.navigate_to().await.unwrap();
            assert!(page.is_loaded().await.unwrap());
            assert_eq!(page.page_name(), "TodoListPage");
            assert!(page.url_pattern().matches(&app.current_url().await.unwrap()));
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigation_failure() {
            let app = seeded_with(
                FakeOptions {
                    offline: true,
                    ..FakeOptions::default()
                },
                &[],
            );
            let config = ProbeConfig::default();
            let err = TodoListPage::new(&app, &config).navigate_to().await.unwrap_err();
            assert!(matches!(err, ProbeError::Navigation { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_open_add_task_page_uses_script_click() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            let add = page.open_add_task_page().await.unwrap();
            assert!(add.is_loaded().await.unwrap());
            assert!(app.was_called("dispatch_click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_reset_state_clears_tasks() {
            let app = seeded(&["One", "Two"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            page.reset_state().await.unwrap();
            assert_eq!(page.get_task_count().await.unwrap(), TaskCount::Known(0));
            assert!(app.stored_tasks().is_empty());
        }
    }

    mod task_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_add_task_then_visible_with_exact_title() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            page.add_task(&TaskSpec::new("Buy milk").with_description("semi-skimmed"))
                .await
                .unwrap();
            page.expect_task_visible("Buy milk", Some("skimmed")).await.unwrap();
            assert_eq!(page.visible_task_titles().await.unwrap(), vec!["Buy milk"]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_task_matches_substrings() {
            let app = seeded(&["Task A", "Task AB"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(app.count(&page.find_task("Task A")).await.unwrap(), 2);
            assert_eq!(app.count(&page.find_task("Task AB")).await.unwrap(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_complete_is_idempotent() {
            let app = seeded(&["Buy milk"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(
                page.complete_task("Buy milk").await.unwrap(),
                ActionOutcome::Performed
            );
            assert_eq!(
                page.complete_task("Buy milk").await.unwrap(),
                ActionOutcome::AlreadySatisfied
            );
            page.expect_task_completed("Buy milk", true).await.unwrap();
            assert!(app.was_called("press:Escape"));

            assert!(page.uncomplete_task("Buy milk").await.unwrap().performed());
            assert!(!page.uncomplete_task("Buy milk").await.unwrap().performed());
            page.expect_task_completed("Buy milk", false).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_menu_that_never_opens_times_out() {
            let app = seeded_with(
                FakeOptions {
                    menu_never_opens: true,
                    ..FakeOptions::default()
                },
                &["Buy milk"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let err = TodoListPage::new(&app, &config)
                .complete_task("Buy milk")
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_confirm_and_cancel() {
            let app = seeded(&["Keep me", "Drop me"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);

            page.delete_task("Keep me", false).await.unwrap();
            page.expect_task_visible("Keep me", None).await.unwrap();

            page.delete_task("Drop me", true).await.unwrap();
            page.expect_task_hidden("Drop me").await.unwrap();
            assert_eq!(page.visible_task_count().await.unwrap(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_absent_task_is_noop() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let outcome = TodoListPage::new(&app, &config)
                .delete_task("Ghost", true)
                .await
                .unwrap();
            assert_eq!(outcome, ActionOutcome::AlreadySatisfied);
            assert!(!app.was_called("click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_slow_removal_is_waited_for() {
            let app = seeded_with(
                FakeOptions {
                    removal_delay_ms: 3_000,
                    animation_ms: 150,
                    ..FakeOptions::default()
                },
                &["Buy milk"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            TodoListPage::new(&app, &config)
                .delete_task("Buy milk", true)
                .await
                .unwrap();
            assert!(app.tasks().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_stuck_delete_times_out() {
            let app = seeded_with(
                FakeOptions {
                    stuck_delete: true,
                    ..FakeOptions::default()
                },
                &["Buy milk"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let err = TodoListPage::new(&app, &config)
                .delete_task("Buy milk", true)
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_all_via_ui() {
            let app = seeded(&["One", "Two", "Three"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(page.delete_all_via_ui().await.unwrap(), 3);
            assert!(app.tasks().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_all_on_empty_list() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(page.delete_all_via_ui().await.unwrap(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_all_stops_on_stuck_ui() {
            let app = seeded_with(
                FakeOptions {
                    stuck_delete: true,
                    ..FakeOptions::default()
                },
                &["One", "Two"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let result = TodoListPage::new(&app, &config).delete_all_via_ui().await;
            assert!(result.is_err());
            assert_eq!(app.tasks().len(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_all_gives_up_when_count_never_drops() {
            let app = seeded_with(
                FakeOptions {
                    replace_deleted: true,
                    ..FakeOptions::default()
                },
                &["One", "Two"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let err = TodoListPage::new(&app, &config)
                .delete_all_via_ui()
                .await
                .unwrap_err();

            // The delete itself succeeded; the final emptiness check is what fails.
            match err {
                ProbeError::AssertionFailed { message } => {
                    assert!(message.contains("to have count 0"), "{message}");
                }
                other => panic!("expected assertion failure, got {other:?}"),
            }
            let confirm = crate::registry::DeleteDialogLocators::new().confirm_button;
            let confirms = app
                .history()
                .iter()
                .filter(|call| **call == format!("click:{confirm}"))
                .count();
            assert_eq!(confirms, 1);
            let titles: Vec<_> = app.tasks().into_iter().map(|t| t.title).collect();
            assert_eq!(titles, vec!["Two", "Arrival 3"]);
        }
    }

    mod search_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_search_filters_and_clear_restores() {
            let app = seeded(&["Alpha report", "Beta review"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);

            page.search_tasks("alpha").await.unwrap();
            page.expect_task_visible("Alpha report", None).await.unwrap();
            page.expect_task_hidden("Beta review").await.unwrap();

            page.clear_search().await.unwrap();
            assert_eq!(
                page.visible_task_titles().await.unwrap(),
                vec!["Alpha report", "Beta review"]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_search_waits_for_debounced_filter() {
            let app = seeded_with(
                FakeOptions {
                    search_debounce_ms: 300,
                    ..FakeOptions::default()
                },
                &["Alpha report", "Beta review"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);

            page.search_tasks("alpha").await.unwrap();
            assert_eq!(page.visible_task_count().await.unwrap(), 1);

            page.clear_search().await.unwrap();
            assert_eq!(page.visible_task_count().await.unwrap(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_search_matching_everything_spends_budget() {
            let app = seeded(&["Alpha report", "Alpha review"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);

            let start = tokio::time::Instant::now();
            page.search_tasks("alpha").await.unwrap();
            assert!(start.elapsed() >= std::time::Duration::from_millis(config.settle.search_ms));
            assert_eq!(page.visible_task_count().await.unwrap(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_search_placeholder() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            TodoListPage::new(&app, &config)
                .expect_search_placeholder("Search for task...")
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_purge_empties_list() {
            let app = seeded(&["One", "Two", "Three"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            page.purge_all_tasks().await.unwrap();
            page.expect_no_tasks().await.unwrap();
            assert!(!app.is_visible(&page.locators().sidebar_drawer).await.unwrap());
        }
    }

    mod count_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_count_from_header_and_empty_state() {
            let app = seeded(&["One", "Two"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(page.get_task_count().await.unwrap(), TaskCount::Known(2));
            page.expect_task_count(2).await.unwrap();

            page.complete_task("One").await.unwrap();
            page.expect_task_count(1).await.unwrap();
            page.expect_total_task_cards(2).await.unwrap();

            page.purge_all_tasks().await.unwrap();
            assert_eq!(page.get_task_count().await.unwrap(), TaskCount::Known(0));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_indicators_are_ambiguous() {
            let app = seeded_with(
                FakeOptions {
                    hide_count_header: true,
                    ..FakeOptions::default()
                },
                &["One"],
            );
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            assert_eq!(page.get_task_count().await.unwrap(), TaskCount::Unknown);
            let err = page.expect_task_count(1).await.unwrap_err();
            assert!(matches!(err, ProbeError::AmbiguousState { .. }), "{err:?}");
        }

        #[tokio::test(start_paused = true)]
        async fn test_wrong_count_reports_observation() {
            let app = seeded(&["One"]);
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let err = TodoListPage::new(&app, &config)
                .expect_task_count(3)
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
        async fn test_list_contents_with_completion() {
            let app = FakeTodoApp::new();
            let config = ProbeConfig::default();
            loaded(&app, &config).await;
            let page = TodoListPage::new(&app, &config);
            let tasks = [
                TaskSpec::new("First").with_description("one"),
                TaskSpec::new("Second"),
            ];
            page.add_tasks(&tasks).await.unwrap();
            page.complete_task("Second").await.unwrap();
            page.expect_task_list_to_contain(&tasks, Some(&[false, true][..]))
                .await
                .unwrap();
        }
    }
}
