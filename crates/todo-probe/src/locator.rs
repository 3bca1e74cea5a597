//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a declarative, immutable chain of [`Step`]s. It never holds
//! an element handle: every query serialises the chain to JSON and evaluates it
//! in the page through one embedded resolver script, so each use observes the
//! DOM as it is *now*.
//!
//! # Design Philosophy
//!
//! - **Re-evaluated**: the React tree is rebuilt constantly, handles go stale
//! - **Composable**: scoping (`locator`), filtering (`with_text`, `visible`,
//!   `nth`) and fallbacks (`or`, `any_of`) are all plain steps
//! - **Non-strict**: queries act on the first visible match, falling back to
//!   the first match

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::ProbeResult;

/// Attribute used to hand a resolved element over to native CDP input
pub const MARK_ATTRIBUTE: &str = "data-todo-probe-target";

/// A single resolution step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Descendants matching a CSS selector
    Css {
        /// CSS selector
        value: String,
    },
    /// Innermost descendants whose normalised text equals the value exactly
    Text {
        /// Expected text
        value: String,
    },
    /// Descendants with an ARIA role and accessible name
    Role {
        /// ARIA role (`button`, `dialog`, ...)
        role: String,
        /// Accessible name (aria-label or text)
        name: String,
    },
    /// Keep current matches whose text contains the value (case-insensitive)
    HasText {
        /// Substring to look for
        value: String,
    },
    /// Keep only the match at `index`
    Nth {
        /// Zero-based index
        index: usize,
    },
    /// Keep only rendered, non-hidden matches
    Visible,
    /// Union of alternative chains, in document order
    Any {
        /// Alternative chains evaluated from the same roots
        branches: Vec<Vec<Step>>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { value } => write!(f, "css={value}"),
            Self::Text { value } => write!(f, "text={value:?}"),
            Self::Role { role, name } => write!(f, "role={role}[name={name:?}]"),
            Self::HasText { value } => write!(f, "has_text={value:?}"),
            Self::Nth { index } => write!(f, "nth={index}"),
            Self::Visible => write!(f, "visible"),
            Self::Any { branches } => {
                write!(f, "any(")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write_chain(f, branch)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, steps: &[Step]) -> fmt::Result {
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            write!(f, " >> ")?;
        }
        write!(f, "{step}")?;
    }
    Ok(())
}

/// Query evaluated against a locator's matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LocatorQuery {
    /// Number of matches
    Count,
    /// Whether any match is visible
    Visible,
    /// Whether the target is visible with no running animations
    Settled,
    /// `textContent` of the target
    Text,
    /// `textContent` of every match
    Texts,
    /// Attribute of the target
    Attribute {
        /// Attribute name
        name: String,
    },
    /// Tag the target with [`MARK_ATTRIBUTE`] and scroll it into view
    Mark {
        /// Unique token written to the attribute
        token: String,
    },
    /// Call `HTMLElement.click()` on the target
    DispatchClick,
    /// Set the target's value through the native setter and fire input events
    Fill {
        /// New value
        value: String,
    },
}

/// Resolver evaluated in the page: `(steps, query) => result`
const RESOLVER_JS: &str = r#"(function (steps, query) {
  const MARK = 'data-todo-probe-target';
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const isVisible = (el) => {
    if (!el || !el.isConnected) return false;
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const ROLE_SELECTORS = {
    button: 'button, [role="button"], input[type="button"], input[type="submit"]',
    dialog: 'dialog, [role="dialog"]',
    menu: '[role="menu"]',
    menuitem: '[role="menuitem"], [role="menu"] li',
    textbox: 'input:not([type]), input[type="text"], textarea, [role="textbox"]',
  };
  const accessibleName = (el) => norm(el.getAttribute('aria-label') || el.textContent || el.value);
  const descendants = (roots, selector) => {
    const out = [];
    for (const root of roots) {
      for (const el of root.querySelectorAll(selector)) out.push(el);
    }
    return out;
  };
  const unique = (els) => {
    const seen = new Set();
    const out = els.filter((el) => (seen.has(el) ? false : (seen.add(el), true)));
    return out.sort((a, b) => {
      if (a === b) return 0;
      return (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING) ? -1 : 1;
    });
  };
  const apply = (roots, chain) => chain.reduce((current, step) => {
    switch (step.kind) {
      case 'css':
        return unique(descendants(current, step.value));
      case 'text':
        return unique(descendants(current, '*').filter((el) =>
          norm(el.textContent) === step.value &&
          !Array.from(el.children).some((c) => norm(c.textContent) === step.value)));
      case 'role':
        return unique(descendants(current, ROLE_SELECTORS[step.role] || `[role="${step.role}"]`)
          .filter((el) => accessibleName(el) === step.name));
      case 'has_text': {
        const needle = norm(step.value).toLowerCase();
        return current.filter((el) => norm(el.textContent).toLowerCase().includes(needle));
      }
      case 'nth':
        return step.index < current.length ? [current[step.index]] : [];
      case 'visible':
        return current.filter(isVisible);
      case 'any':
        return unique(step.branches.flatMap((branch) => apply(current, branch)));
      default:
        throw new Error(`unknown locator step: ${step.kind}`);
    }
  }, roots);

  const els = apply([document], steps);
  const target = els.find(isVisible) || els[0] || null;
  switch (query.op) {
    case 'count':
      return els.length;
    case 'visible':
      return els.some(isVisible);
    case 'settled':
      return !!target && isVisible(target) &&
        target.getAnimations({ subtree: true }).every((a) => a.playState !== 'running');
    case 'text':
      return target ? target.textContent : null;
    case 'texts':
      return els.map((el) => el.textContent || '');
    case 'attribute':
      return target ? target.getAttribute(query.name) : null;
    case 'mark':
      if (!target) return false;
      document.querySelectorAll(`[${MARK}]`).forEach((el) => el.removeAttribute(MARK));
      target.setAttribute(MARK, query.token);
      target.scrollIntoView({ block: 'center', inline: 'center' });
      return true;
    case 'dispatch_click':
      if (!target) return false;
      target.click();
      return true;
    case 'fill': {
      if (!target) return false;
      target.focus();
      const descriptor = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(target), 'value');
      if (descriptor && descriptor.set) descriptor.set.call(target, query.value);
      else target.value = query.value;
      target.dispatchEvent(new Event('input', { bubbles: true }));
      target.dispatchEvent(new Event('change', { bubbles: true }));
      return true;
    }
    default:
      throw new Error(`unknown locator query: ${query.op}`);
  }
})"#;

/// A declarative, re-evaluated element query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    /// Locator matching a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Css {
                value: selector.into(),
            }],
        }
    }

    /// Locator matching the innermost element with this exact text
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Text { value: text.into() }],
        }
    }

    /// Locator matching an ARIA role with an accessible name
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Role {
                role: role.into(),
                name: name.into(),
            }],
        }
    }

    /// Union of alternatives; whichever match exists wins
    #[must_use]
    pub fn any_of(alternatives: impl IntoIterator<Item = Self>) -> Self {
        Self {
            steps: vec![Step::Any {
                branches: alternatives.into_iter().map(|l| l.steps).collect(),
            }],
        }
    }

    /// Scope `child` inside this locator's matches
    #[must_use]
    pub fn locator(&self, child: &Self) -> Self {
        let mut steps = self.steps.clone();
        steps.extend(child.steps.iter().cloned());
        Self { steps }
    }

    /// Keep matches whose text contains `text` (case-insensitive)
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.steps.push(Step::HasText { value: text.into() });
        self
    }

    /// Keep the match at `index`
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.steps.push(Step::Nth { index });
        self
    }

    /// Keep the first match
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Keep only visible matches
    #[must_use]
    pub fn visible(mut self) -> Self {
        self.steps.push(Step::Visible);
        self
    }

    /// Either this locator or `other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self.steps.as_slice() {
            [Step::Any { branches }] => {
                let mut branches = branches.clone();
                branches.push(other.steps);
                Self {
                    steps: vec![Step::Any { branches }],
                }
            }
            _ => Self::any_of([self, other]),
        }
    }

    /// Resolution steps, in order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Build the page script evaluating `query` against this locator
    pub fn script(&self, query: &LocatorQuery) -> ProbeResult<String> {
        let steps = serde_json::to_string(&self.steps)?;
        let query = serde_json::to_string(query)?;
        Ok(format!("{RESOLVER_JS}({steps}, {query})"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_chain(f, &self.steps)
    }
}
