//! Regression scenarios.
//!
//! Each [`RegressionCase`] composes page-object operations into one business
//! workflow and runs against any [`PageDriver`]. Cases expect to start on a
//! freshly loaded list view (see [`crate::fixture::run_case`]).

use chrono::{Duration as ChronoDuration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::expect::expect;
use crate::pages::TodoListPage;
use crate::result::{ProbeError, ProbeResult};
use crate::task::{unique_title, TaskSpec};

/// Title of the fixed end-to-end task
pub const E2E_TITLE: &str = "Regression 001";

/// Description of the fixed end-to-end task
pub const E2E_DESCRIPTION: &str = "desc";

/// The regression suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegressionCase {
    /// Add a task with a title only
    AddBasicTask,
    /// Add a task and delete it, confirming
    DeleteConfirmed,
    /// Start deleting a task and cancel
    DeleteCancelled,
    /// Complete a task twice, then uncomplete it
    CompleteIdempotent,
    /// Search narrows the list, clearing restores it
    SearchFilters,
    /// Add a task with every optional field
    AddWithDetails,
    /// Submitting without a name is rejected
    NameRequired,
    /// Purge removes every task
    PurgeAll,
    /// Create, verify and delete "Regression 001"
    EndToEnd,
}

impl RegressionCase {
    /// Every case, in suite order
    pub const ALL: [Self; 9] = [
        Self::AddBasicTask,
        Self::DeleteConfirmed,
        Self::DeleteCancelled,
        Self::CompleteIdempotent,
        Self::SearchFilters,
        Self::AddWithDetails,
        Self::NameRequired,
        Self::PurgeAll,
        Self::EndToEnd,
    ];

    /// Every case, in suite order
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &Self::ALL
    }

    /// Stable identifier, e.g. `TC_REG_001`
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::AddBasicTask => "TC_REG_001",
            Self::DeleteConfirmed => "TC_REG_002",
            Self::DeleteCancelled => "TC_REG_003",
            Self::CompleteIdempotent => "TC_REG_004",
            Self::SearchFilters => "TC_REG_005",
            Self::AddWithDetails => "TC_REG_006",
            Self::NameRequired => "TC_REG_007",
            Self::PurgeAll => "TC_REG_008",
            Self::EndToEnd => "TC_REG_009",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AddBasicTask => "add a basic task and see it listed",
            Self::DeleteConfirmed => "delete a task with confirmation",
            Self::DeleteCancelled => "cancelled delete keeps the task",
            Self::CompleteIdempotent => "completing twice is a no-op, uncomplete restores",
            Self::SearchFilters => "search filters the list and clearing restores it",
            Self::AddWithDetails => "add a task with description, deadline and colour",
            Self::NameRequired => "empty name is rejected",
            Self::PurgeAll => "purge removes every task",
            Self::EndToEnd => "Regression 001: create, verify, delete",
        }
    }

    /// Look a case up by id, ignoring case
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|case| case.id().eq_ignore_ascii_case(id))
    }

    /// Whether `filter` appears in the id or description, ignoring case
    #[must_use]
    pub fn matches(self, filter: &str) -> bool {
        let needle = filter.to_lowercase();
        self.id().to_lowercase().contains(&needle)
            || self.description().to_lowercase().contains(&needle)
    }

    /// Run the scenario
    pub async fn run<D: PageDriver + ?Sized>(
        self,
        driver: &D,
        config: &ProbeConfig,
    ) -> ProbeResult<()> {
        info!(case = self.id(), "running scenario");
        let list = TodoListPage::new(driver, config);
        match self {
            Self::AddBasicTask => {
                let title = unique_title("Basic task");
                list.add_task(&TaskSpec::new(&title)).await?;
                list.expect_task_visible(&title, None).await
            }
            Self::DeleteConfirmed => {
                let title = unique_title("Delete me");
                list.add_task(&TaskSpec::new(&title)).await?;
                list.delete_task(&title, true).await?;
                list.expect_task_hidden(&title).await
            }
            Self::DeleteCancelled => {
                let title = unique_title("Keep me");
                list.add_task(&TaskSpec::new(&title)).await?;
                list.delete_task(&title, false).await?;
                list.expect_task_visible(&title, None).await
            }
            Self::CompleteIdempotent => {
                let title = unique_title("Complete me");
                list.add_task(&TaskSpec::new(&title)).await?;
                list.complete_task(&title).await?;
                if list.complete_task(&title).await?.performed() {
                    return Err(ProbeError::assertion(format!(
                        "second completion of {title:?} changed the task"
                    )));
                }
                list.expect_task_completed(&title, true).await?;
                list.uncomplete_task(&title).await?;
                list.expect_task_completed(&title, false).await
            }
            Self::SearchFilters => {
                let alpha = unique_title("Alpha");
                let beta = unique_title("Beta");
                list.add_tasks(&[TaskSpec::new(&alpha), TaskSpec::new(&beta)])
                    .await?;
                list.search_tasks("Alpha").await?;
                list.expect_task_visible(&alpha, None).await?;
                list.expect_task_hidden(&beta).await?;
                list.clear_search().await?;
                list.expect_task_visible(&alpha, None).await?;
                list.expect_task_visible(&beta, None).await
            }
            Self::AddWithDetails => {
                let title = unique_title("Detailed task");
                let deadline = (Utc::now() + ChronoDuration::days(1))
                    .naive_utc()
                    .with_second(0)
                    .and_then(|d| d.with_nanosecond(0))
                    .ok_or_else(|| ProbeError::Input {
                        message: "cannot build deadline".to_string(),
                    })?;
                let task = TaskSpec::new(&title)
                    .with_description("with every optional field")
                    .with_deadline(deadline)
                    .with_color(2);
                list.add_task(&task).await?;
                list.expect_task_visible(&title, task.description.as_deref())
                    .await
            }
            Self::NameRequired => {
                let add = list.open_add_task_page().await?;
                add.expect_name_required_error().await?;
                add.expect_on_add_task_page().await
            }
            Self::PurgeAll => {
                let tasks: Vec<TaskSpec> = (1..=3)
                    .map(|n| TaskSpec::new(unique_title(&format!("Purge {n}"))))
                    .collect();
                list.add_tasks(&tasks).await?;
                list.expect_total_task_cards(tasks.len()).await?;
                list.purge_all_tasks().await?;
                list.expect_total_task_cards(0).await?;
                expect(driver, &list.locators().empty_state)
                    .within(config.timeouts.expect_ms)
                    .to_be_visible()
                    .await
            }
            Self::EndToEnd => {
                let task = TaskSpec::new(E2E_TITLE).with_description(E2E_DESCRIPTION);
                list.add_task(&task).await?;
                list.expect_task_visible(E2E_TITLE, Some(E2E_DESCRIPTION))
                    .await?;
                list.delete_task(E2E_TITLE, true).await?;
                list.expect_task_hidden(E2E_TITLE).await?;
                expect(driver, &list.find_task(E2E_TITLE))
                    .within(config.timeouts.expect_ms)
                    .to_have_count(0)
                    .await
            }
        }
    }
}

impl fmt::Display for RegressionCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id(), self.description())
    }
}
