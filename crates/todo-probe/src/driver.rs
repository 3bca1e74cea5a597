//! PageDriver - the browser capability page objects are written against.
//!
//! Page objects never talk to chromiumoxide directly. They hold a `&D` where
//! `D: PageDriver`, which lets the same page objects run against:
//!
//! - [`BrowserPage`](crate::browser::BrowserPage): a real Chromium tab over CDP
//! - [`FakeTodoApp`](crate::fake::FakeTodoApp): an in-memory rendition of the
//!   application surface for offline tests
//!
//! Everything locator-shaped has a default implementation that evaluates the
//! locator resolver through [`PageDriver::evaluate`]; a CDP driver only has to
//! supply navigation, evaluation, native input and screenshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;

use crate::locator::{Locator, LocatorQuery};
use crate::result::{ProbeError, ProbeResult};

/// Keyboard keys the automation layer presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape (closes menus, drawers and dialogs)
    Escape,
}

impl Key {
    /// DOM `key` value
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Escape => "Escape",
        }
    }

    /// DOM `code` value
    #[must_use]
    pub const fn code(self) -> &'static str {
        self.name()
    }

    /// Windows virtual key code, required by CDP for non-printable keys
    #[must_use]
    pub const fn key_code(self) -> i64 {
        match self {
            Self::Escape => 27,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Captured page screenshot
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when the screenshot was taken
    pub captured_at: DateTime<Utc>,
}

impl Screenshot {
    /// Wrap PNG bytes captured now
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }

    /// Write the PNG to `path`, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> ProbeResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }
}

/// Browser capability consumed by page objects
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the load event
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Reload the current document
    async fn reload(&self) -> ProbeResult<()>;

    /// Current document URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Evaluate a script expression and return its JSON value
    async fn evaluate(&self, script: &str) -> ProbeResult<Value>;

    /// Native (trusted) pointer click on the locator's target
    async fn click(&self, locator: &Locator) -> ProbeResult<()>;

    /// Press and release a key on the focused element
    async fn press_key(&self, key: Key) -> ProbeResult<()>;

    /// Capture the viewport as PNG
    async fn screenshot(&self) -> ProbeResult<Screenshot>;

    /// Release the page
    async fn close(&self) -> ProbeResult<()>;

    /// Evaluate a resolver query for `locator`
    async fn query(&self, locator: &Locator, query: LocatorQuery) -> ProbeResult<Value> {
        let script = locator.script(&query)?;
        self.evaluate(&script).await
    }

    /// Number of elements the locator matches
    async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        let value = self.query(locator, LocatorQuery::Count).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| unexpected("count", locator, &value))
    }

    /// Whether any match is visible
    async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
        let value = self.query(locator, LocatorQuery::Visible).await?;
        value
            .as_bool()
            .ok_or_else(|| unexpected("visibility", locator, &value))
    }

    /// Whether the target is visible and has no running animations
    async fn is_settled(&self, locator: &Locator) -> ProbeResult<bool> {
        let value = self.query(locator, LocatorQuery::Settled).await?;
        value
            .as_bool()
            .ok_or_else(|| unexpected("settled state", locator, &value))
    }

    /// Text content of the target, `None` when nothing matches
    async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
        let value = self.query(locator, LocatorQuery::Text).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Text content of every match, in document order
    async fn all_text_contents(&self, locator: &Locator) -> ProbeResult<Vec<String>> {
        let value = self.query(locator, LocatorQuery::Texts).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Attribute of the target, `None` when absent or nothing matches
    async fn attribute(&self, locator: &Locator, name: &str) -> ProbeResult<Option<String>> {
        let value = self
            .query(
                locator,
                LocatorQuery::Attribute {
                    name: name.to_string(),
                },
            )
            .await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Script-dispatched click, bypassing pointer hit-testing
    async fn dispatch_click(&self, locator: &Locator) -> ProbeResult<()> {
        let value = self.query(locator, LocatorQuery::DispatchClick).await?;
        require_target(locator, &value)
    }

    /// Replace the target's value, firing the events React listens to
    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        let result = self
            .query(
                locator,
                LocatorQuery::Fill {
                    value: value.to_string(),
                },
            )
            .await?;
        require_target(locator, &result)
    }
}

fn unexpected(what: &str, locator: &Locator, value: &Value) -> ProbeError {
    ProbeError::script(format!("unexpected {what} for {locator}: {value}"))
}

/// Resolver actions return `false` when the locator matched nothing
pub(crate) fn require_target(locator: &Locator, value: &Value) -> ProbeResult<()> {
    if value.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(ProbeError::Input {
            message: format!("no element matches {locator}"),
        })
    }
}
