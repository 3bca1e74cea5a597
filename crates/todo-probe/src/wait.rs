//! Resilient waits.
//!
//! Every wait in the automation layer is bounded. Conditions are polled with
//! exponential backoff, probe errors count as "not yet", and fixed settle
//! sleeps are replaced by quiescence polling inside the same budget.
//!
//! All timing goes through `tokio::time`, so tests can run on a paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::PageDriver;
use crate::page_object::UrlPattern;
use crate::result::{ProbeError, ProbeResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for assertions (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// First polling interval (25ms)
pub const DEFAULT_INITIAL_POLL_MS: u64 = 25;

/// Polling interval ceiling (250ms)
pub const DEFAULT_MAX_POLL_MS: u64 = 250;

/// Polling interval growth factor
pub const DEFAULT_BACKOFF: f64 = 1.5;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for bounded polling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOptions {
    /// Total budget in milliseconds
    pub timeout_ms: u64,
    /// First polling interval in milliseconds
    pub initial_poll_ms: u64,
    /// Largest polling interval in milliseconds
    pub max_poll_ms: u64,
    /// Interval multiplier applied after every unsuccessful poll
    pub backoff: f64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            initial_poll_ms: DEFAULT_INITIAL_POLL_MS,
            max_poll_ms: DEFAULT_MAX_POLL_MS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options with a different budget
    #[must_use]
    pub fn timeout_ms(timeout_ms: u64) -> Self {
        Self::default().with_timeout(timeout_ms)
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set first polling interval in milliseconds
    #[must_use]
    pub const fn with_initial_poll(mut self, initial_poll_ms: u64) -> Self {
        self.initial_poll_ms = initial_poll_ms;
        self
    }

    /// Set polling interval ceiling in milliseconds
    #[must_use]
    pub const fn with_max_poll(mut self, max_poll_ms: u64) -> Self {
        self.max_poll_ms = max_poll_ms;
        self
    }

    /// Set interval multiplier (values below 1.0 are treated as 1.0)
    #[must_use]
    pub const fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Interval following `current`
    #[must_use]
    pub fn next_poll(&self, current: Duration) -> Duration {
        let grown = current.mul_f64(self.backoff.max(1.0));
        grown.min(Duration::from_millis(self.max_poll_ms.max(1)))
    }

    fn initial_poll(&self) -> Duration {
        Duration::from_millis(self.initial_poll_ms.clamp(1, self.max_poll_ms.max(1)))
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields a value or the budget runs out.
///
/// Probe errors are treated as "not yet"; the last one is attached to the
/// timeout error.
pub async fn wait_for_value<T, F, Fut>(
    what: &str,
    options: &WaitOptions,
    mut probe: F,
) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let deadline = Instant::now() + options.timeout();
    let mut interval = options.initial_poll();
    let mut last_error = None;

    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) => {
                trace!(what, error = %err, "probe failed, retrying");
                last_error = Some(err.to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(what, timeout_ms = options.timeout_ms, "wait timed out");
            return Err(ProbeError::Timeout {
                what: what.to_string(),
                ms: options.timeout_ms,
                last_error,
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = options.next_poll(interval);
    }
}

/// Poll `probe` until it returns `true` or the budget runs out
pub async fn wait_until<F, Fut>(what: &str, options: &WaitOptions, mut probe: F) -> ProbeResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<bool>>,
{
    wait_for_value(what, options, || {
        let fut = probe();
        async move { fut.await.map(|ok| ok.then_some(())) }
    })
    .await
}

/// How a quiescence wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// The snapshot stopped changing for the quiet period
    Stable,
    /// The budget was spent first
    BudgetSpent,
}

/// Wait until `snapshot` stops changing for `quiet`, spending at most `budget`.
///
/// Never fails: running out of budget is the same outcome as the fixed
/// delay this replaces. Snapshot errors restart the quiet period.
pub async fn wait_for_stable<T, F, Fut>(
    what: &str,
    quiet: Duration,
    budget: Duration,
    mut snapshot: F,
) -> Settle
where
    T: PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    let start = Instant::now();
    let deadline = start + budget;
    let poll = (quiet / 4).max(Duration::from_millis(10));
    let mut last: Option<T> = None;
    let mut stable_since = start;

    loop {
        let current = snapshot().await.ok();
        let unchanged = matches!((&last, &current), (Some(a), Some(b)) if a == b);
        if !unchanged {
            stable_since = Instant::now();
        }

        let now = Instant::now();
        if current.is_some() && now.duration_since(stable_since) >= quiet {
            trace!(what, elapsed_ms = now.duration_since(start).as_millis() as u64, "stable");
            return Settle::Stable;
        }
        if now >= deadline {
            debug!(what, budget_ms = budget.as_millis() as u64, "settle budget spent");
            return Settle::BudgetSpent;
        }
        last = current;
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Wait until `snapshot` differs from `baseline`, spending at most `budget`.
///
/// Returns whether a change was seen. Snapshot errors count as no change.
pub async fn wait_for_change<T, B, F, Fut>(
    what: &str,
    baseline: &B,
    budget: Duration,
    mut snapshot: F,
) -> bool
where
    T: PartialEq<B>,
    B: ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    let options = WaitOptions::timeout_ms(budget.as_millis() as u64);
    let changed = wait_for_value(what, &options, || {
        let fut = snapshot();
        async move { Ok(fut.await.ok().filter(|current| *current != *baseline).map(|_| ())) }
    })
    .await;
    changed.is_ok()
}

/// Try `candidates` in order, each with an equal share of `budget`.
///
/// Returns the index of the first candidate whose attempt succeeds, or every
/// attempt's error when none does.
pub async fn first_match<'c, T, F, Fut>(
    candidates: &'c [T],
    budget: Duration,
    mut attempt: F,
) -> Result<usize, Vec<ProbeError>>
where
    F: FnMut(&'c T, Duration) -> Fut,
    Fut: Future<Output = ProbeResult<()>>,
{
    if candidates.is_empty() {
        return Err(Vec::new());
    }
    let share = budget / candidates.len() as u32;
    let mut errors = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        match attempt(candidate, share).await {
            Ok(()) => return Ok(index),
            Err(err) => {
                debug!(index, error = %err, "strategy failed, trying next");
                errors.push(err);
            }
        }
    }
    Err(errors)
}

/// Wait until the driver's URL matches `pattern`
pub async fn wait_for_url<D: PageDriver + ?Sized>(
    driver: &D,
    pattern: &UrlPattern,
    timeout_ms: u64,
) -> ProbeResult<()> {
    let what = format!("URL matching {pattern}");
    wait_until(&what, &WaitOptions::timeout_ms(timeout_ms), move || async move {
        let url = driver.current_url().await?;
        Ok(pattern.matches(&url))
    })
    .await
}
