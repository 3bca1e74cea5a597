//! Observed task data and the small value types page objects return.

use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::registry::list::TASK_COUNT_PATTERN;

/// Format accepted by `<input type="datetime-local">`
pub const DEADLINE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Timestamp suffix appended by [`unique_title`]
pub const TITLE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// A task as entered through the add-task screen.
///
/// The title is the identity key on the list view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task title
    pub title: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDateTime>,
    /// Optional colour swatch index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_index: Option<usize>,
}

impl TaskSpec {
    /// Task with only a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the deadline
    #[must_use]
    pub const fn with_deadline(mut self, deadline: NaiveDateTime) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the colour swatch
    #[must_use]
    pub const fn with_color(mut self, index: usize) -> Self {
        self.color_index = Some(index);
        self
    }
}

/// `base` suffixed with a millisecond UTC timestamp, unique per run
#[must_use]
pub fn unique_title(base: &str) -> String {
    format!("{base} {}", Utc::now().format(TITLE_STAMP_FORMAT))
}

/// Render a deadline for the datetime-local input
#[must_use]
pub fn format_deadline(deadline: &NaiveDateTime) -> String {
    deadline.format(DEADLINE_FORMAT).to_string()
}

/// Task count as derived from the list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskCount {
    /// Count read from the header or implied by the empty state
    Known(usize),
    /// Neither indicator was present
    Unknown,
}

impl TaskCount {
    /// The count, if known
    #[must_use]
    pub const fn known(self) -> Option<usize> {
        match self {
            Self::Known(n) => Some(n),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for TaskCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(n) => write!(f, "{n}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

fn count_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TASK_COUNT_PATTERN).ok()).as_ref()
}

/// Extract the count from a header such as "You have 3 tasks to complete"
#[must_use]
pub fn parse_task_count(header: &str) -> Option<usize> {
    count_regex()?
        .captures(header)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Result of a state-changing action that may already have been satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran
    Performed,
    /// The target state already held; nothing was changed
    AlreadySatisfied,
}

impl ActionOutcome {
    /// Whether the action changed anything
    #[must_use]
    pub const fn performed(self) -> bool {
        matches!(self, Self::Performed)
    }
}
