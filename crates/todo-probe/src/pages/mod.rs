//! Page objects, one per screen of the application.
//!
//! Each page object borrows a [`PageDriver`] and the run's [`ProbeConfig`]
//! and owns its screen's locators. Operations are short sequences of
//! locate, act, wait for the UI to settle, and optionally assert.

mod add_task;
mod delete_dialog;
mod todo_list;

pub use add_task::AddTaskPage;
pub use delete_dialog::DeleteTaskDialog;
pub use todo_list::TodoListPage;

use std::time::Duration;

use crate::config::SettleBudgets;
use crate::driver::PageDriver;
use crate::expect::expect;
use crate::locator::Locator;
use crate::registry::list::TASK_CONTAINER;
use crate::wait::{wait_for_change, wait_for_stable, Settle};

/// Script clearing the application's persisted tasks
pub(crate) const CLEAR_STORAGE_JS: &str = "window.localStorage.clear()";

/// Wait for `locator`'s target to finish animating, spending at most
/// `budget_ms`. Never fails.
pub(crate) async fn settle_on<D: PageDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    budget_ms: u64,
) -> Settle {
    match expect(driver, locator).within(budget_ms).to_be_settled().await {
        Ok(()) => Settle::Stable,
        Err(_) => Settle::BudgetSpent,
    }
}

/// Wait for the rendered task list to stop changing, spending at most
/// `budget_ms`. Never fails.
pub(crate) async fn settle_list<D: PageDriver + ?Sized>(
    driver: &D,
    settle: &SettleBudgets,
    budget_ms: u64,
) -> Settle {
    let containers = Locator::css(TASK_CONTAINER);
    let containers = &containers;
    wait_for_stable(
        "task list",
        settle.quiet(),
        Duration::from_millis(budget_ms),
        move || async move { driver.all_text_contents(containers).await },
    )
    .await
}

/// Wait for the rendered task list to move away from `before` and then stop
/// changing, spending at most `budget_ms` overall. Never fails.
///
/// Covers updates that land late, like a debounced filter: a list that never
/// moves off `before` spends the whole budget.
pub(crate) async fn settle_list_after_change<D: PageDriver + ?Sized>(
    driver: &D,
    settle: &SettleBudgets,
    budget_ms: u64,
    before: &[String],
) -> Settle {
    let start = tokio::time::Instant::now();
    let budget = Duration::from_millis(budget_ms);
    let containers = Locator::css(TASK_CONTAINER);
    let containers = &containers;
    let changed = wait_for_change("task list change", before, budget, move || async move {
        driver.all_text_contents(containers).await
    })
    .await;
    if !changed {
        return Settle::BudgetSpent;
    }
    let remaining = budget.saturating_sub(start.elapsed()).max(settle.quiet());
    settle_list(driver, settle, remaining.as_millis() as u64).await
}
