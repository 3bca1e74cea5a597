//! Page Object Model support.
//!
//! A page object owns the locators of one screen and exposes its workflows as
//! methods. It holds a borrowed [`PageDriver`](crate::driver::PageDriver) and
//! its timing configuration, never element handles.

use async_trait::async_trait;
use std::fmt;

use crate::result::ProbeResult;

/// Trait implemented by every page object.
#[async_trait]
pub trait PageObject: Send + Sync {
    /// URL pattern that matches this screen
    fn url_pattern(&self) -> UrlPattern;

    /// Check whether the screen's anchor element is currently visible
    async fn is_loaded(&self) -> ProbeResult<bool>;

    /// Wait budget for the screen to load (in milliseconds)
    fn load_timeout_ms(&self) -> u64 {
        15_000
    }

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// URL matcher used for navigation waits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "**/add")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Glob pattern shorthand
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "{p}"),
            Self::Prefix(p) => write!(f, "{p}*"),
            Self::Contains(p) => write!(f, "*{p}*"),
            Self::Regex(p) => write!(f, "/{p}/"),
            Self::Glob(p) => write!(f, "{p}"),
            Self::Any => write!(f, "*"),
        }
    }
}

/// Glob matching where `*` runs match any text.
///
/// The first literal part is anchored at the start unless the pattern begins
/// with `*`; the last literal part is anchored at the end unless the pattern
/// ends with `*`.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == url;
    }

    let last = parts.len() - 1;
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !url.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == last {
            return url.len() >= pos + part.len() && url[pos..].ends_with(part);
        } else if let Some(found) = url[pos..].find(part) {
            pos += found + part.len();
        } else {
            return false;
        }
    }
    true
}
