//! todo-probe: Page Objects and resilient waits for the React Cool Todo App
//!
//! Drives a real Chromium over the Chrome DevTools Protocol and verifies the
//! application's create/complete/delete/search/purge workflows through a
//! Page-Object layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────┐     │
//! │   │ Scenario   │    │ Page       │    │ PageDriver     │     │
//! │   │ (RegCase)  │───►│ Objects    │───►│ (CDP or fake)  │     │
//! │   └────────────┘    └─────┬──────┘    └────────────────┘     │
//! │                           ▼                                  │
//! │                     Locator Registry                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Control flows one way: scenarios call page objects, page objects resolve
//! registry locators through a [`PageDriver`]. Failures surface as
//! [`ProbeError`]s.
//!
//! ```ignore
//! use todo_probe::prelude::*;
//!
//! let browser = Browser::launch(config.browser.clone()).await?;
//! BrowserSession::run_case(&browser, &config, RegressionCase::EndToEnd, None).await?;
//! ```

#![warn(missing_docs)]

mod browser;
mod config;
mod driver;
mod expect;
mod locator;
mod page_object;
mod result;
mod task;
mod wait;

/// Locator Registry: every selector, per screen
pub mod registry;

/// Page objects for the list, add-task screen and delete dialog
pub mod pages;

/// The regression suite
pub mod scenario;

/// Per-case setup, teardown and browser sessions
pub mod fixture;

/// In-memory application used by offline tests
pub mod fake;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{Browser, BrowserPage};
pub use config::{
    normalize_base_url, ProbeConfig, SettleBudgets, Timeouts, DEFAULT_BASE_URL, ENV_BASE_URL,
    ENV_CHROMIUM, ENV_HEADED, ENV_SLOW_MO,
};
pub use driver::{Key, PageDriver, Screenshot};
pub use expect::{expect, normalize_text, Expect};
pub use locator::{Locator, LocatorQuery, Step, MARK_ATTRIBUTE};
pub use page_object::{PageObject, UrlPattern};
pub use result::{ProbeError, ProbeResult};
pub use task::{
    format_deadline, parse_task_count, unique_title, ActionOutcome, TaskCount, TaskSpec,
};
pub use wait::{
    first_match, wait_for_stable, wait_for_url, wait_for_value, wait_until, Settle, WaitOptions,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Everything a test needs
pub mod prelude {
    pub use super::fixture::{run_case, run_case_capturing, TodoAppFixture};
    #[cfg(feature = "browser")]
    pub use super::fixture::BrowserSession;
    pub use super::pages::{AddTaskPage, DeleteTaskDialog, TodoListPage};
    pub use super::registry::{AddTaskLocators, DeleteDialogLocators, ListLocators};
    pub use super::scenario::RegressionCase;
    #[cfg(feature = "browser")]
    pub use super::{Browser, BrowserPage};
    pub use super::{
        expect, unique_title, ActionOutcome, BrowserConfig, Key, Locator, PageDriver, PageObject,
        ProbeConfig, ProbeError, ProbeResult, TaskCount, TaskSpec, UrlPattern, WaitOptions,
    };
}
