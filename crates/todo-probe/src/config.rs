//! Run configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! YAML file, environment variables, then whatever the caller (the CLI)
//! overrides explicitly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::browser::BrowserConfig;
use crate::result::{ProbeError, ProbeResult};

/// Default deployment under test (Vite dev server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "BASE_URL";
/// Environment variable enabling a visible browser window
pub const ENV_HEADED: &str = "TODO_PROBE_HEADED";
/// Environment variable setting the slow-motion delay in milliseconds
pub const ENV_SLOW_MO: &str = "TODO_PROBE_SLOW_MO";
/// Environment variable pointing at a Chromium binary
pub const ENV_CHROMIUM: &str = "TODO_PROBE_CHROMIUM";

/// Bounded wait budgets, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// List view add affordance after navigation
    pub navigation_ms: u64,
    /// Add-task heading after navigation or URL change
    pub add_page_heading_ms: u64,
    /// Add-task name input after the heading
    pub add_page_input_ms: u64,
    /// Default assertion budget
    pub expect_ms: u64,
    /// New task card after submitting
    pub task_visible_ms: u64,
    /// Deleted task card disappearing
    pub delete_hidden_ms: u64,
    /// Containers reaching zero after a purge
    pub purge_ms: u64,
    /// Sidebar drawer closing
    pub sidebar_hide_ms: u64,
    /// Delete dialog appearing, split across the alternatives
    pub dialog_ms: u64,
    /// Delete dialog disappearing, per alternative
    pub dialog_hide_ms: u64,
    /// Add affordance after a reload
    pub reload_ms: u64,
    /// Count header or empty state after a reset
    pub reset_indicator_ms: u64,
    /// Task count converging to the expected value
    pub count_ms: u64,
    /// First title during the delete-all loop
    pub delete_all_title_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 15_000,
            add_page_heading_ms: 15_000,
            add_page_input_ms: 10_000,
            expect_ms: 5_000,
            task_visible_ms: 10_000,
            delete_hidden_ms: 10_000,
            purge_ms: 10_000,
            sidebar_hide_ms: 5_000,
            dialog_ms: 5_000,
            dialog_hide_ms: 5_000,
            reload_ms: 20_000,
            reset_indicator_ms: 15_000,
            count_ms: 10_000,
            delete_all_title_ms: 5_000,
        }
    }
}

/// Upper bounds for settling after an action, in milliseconds.
///
/// Each budget is spent polling for quiescence; a settled UI returns early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleBudgets {
    /// Quiet period that counts as settled
    pub quiet_ms: u64,
    /// Task menu opening
    pub menu_ms: u64,
    /// Dialog opening animation
    pub dialog_ms: u64,
    /// Before clicking "Delete" in the task menu
    pub pre_delete_ms: u64,
    /// Search filtering
    pub search_ms: u64,
    /// Returning to the list after submitting a task
    pub submit_ms: u64,
    /// Between delete-all iterations
    pub delete_all_ms: u64,
    /// After a storage reset
    pub reset_ms: u64,
}

impl Default for SettleBudgets {
    fn default() -> Self {
        Self {
            quiet_ms: 50,
            menu_ms: 100,
            dialog_ms: 500,
            pre_delete_ms: 500,
            search_ms: 500,
            submit_ms: 500,
            delete_all_ms: 300,
            reset_ms: 500,
        }
    }
}

impl SettleBudgets {
    /// Quiet period as Duration
    #[must_use]
    pub const fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }
}

/// Complete configuration for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Deployment under test, without trailing slash
    pub base_url: String,
    /// Browser settings
    pub browser: BrowserConfig,
    /// Wait budgets
    pub timeouts: Timeouts,
    /// Settle budgets
    pub settle: SettleBudgets,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            timeouts: Timeouts::default(),
            settle: SettleBudgets::default(),
        }
    }
}

impl ProbeConfig {
    /// Defaults, optionally overlaid by a YAML file, then by the environment
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let mut config: Self = serde_yaml_ng::from_str(yaml)?;
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }

    /// Read and parse a YAML file
    pub fn from_yaml_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ProbeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = normalize_base_url(&url);
        }
        if let Some(headed) = lookup(ENV_HEADED) {
            self.browser.headless = !parse_flag(ENV_HEADED, &headed)?;
        }
        if let Some(slow_mo) = lookup(ENV_SLOW_MO) {
            self.browser.slow_mo_ms = slow_mo.trim().parse().map_err(|_| {
                ProbeError::config(format!("{ENV_SLOW_MO} must be milliseconds, got {slow_mo:?}"))
            })?;
        }
        if let Some(path) = lookup(ENV_CHROMIUM).filter(|v| !v.trim().is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        Ok(())
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> ProbeResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return Err(ProbeError::config("viewport dimensions must be non-zero"));
        }
        Ok(())
    }

    /// URL of the list view
    #[must_use]
    pub fn list_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// URL of the add-task screen
    #[must_use]
    pub fn add_task_url(&self) -> String {
        format!("{}/add", self.base_url)
    }
}

/// Strip surrounding whitespace and trailing slashes
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_flag(name: &str, value: &str) -> ProbeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProbeError::config(format!(
            "{name} must be a boolean flag, got {other:?}"
        ))),
    }
}
