//! Search filter over the aggregated view, and the input debouncer.
//!
//! Filtering is a pure projection: it never touches the
//! [`DocumentStore`](crate::store::DocumentStore), so a filtered view is
//! always rebuilt from the current list and cannot go stale.
//!
//! The [`Debouncer`] collapses a burst of keystrokes into one re-render. It
//! works on caller-supplied [`Instant`]s so it can be driven by any event
//! loop (or by tests) without owning a timer.

use std::time::{Duration, Instant};

use crate::models::AggregatedDocument;

/// Default quiet period before a typed query is applied.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Case-insensitive substring match of `query` against the document source.
///
/// An empty or whitespace-only query matches everything.
pub fn matches(doc: &AggregatedDocument, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || doc.source.to_lowercase().contains(&needle)
}

/// Return the documents whose source matches `query`, preserving order.
pub fn filter_documents(docs: &[AggregatedDocument], query: &str) -> Vec<AggregatedDocument> {
    docs.iter().filter(|d| matches(d, query)).cloned().collect()
}

/// Trailing-edge debouncer for the search input.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    latest: Option<String>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            latest: None,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Record a new input value, cancelling any re-render already scheduled.
    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.latest = Some(query.into());
        self.deadline = Some(now + self.quiet);
    }

    /// Yield the settled query once the quiet period has elapsed.
    ///
    /// Returns `Some` at most once per burst of input.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.latest.take()
            }
            _ => None,
        }
    }

    /// Whether a re-render is currently scheduled.
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the scheduled re-render becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drop the scheduled re-render without applying it.
    pub fn cancel(&mut self) {
        self.latest = None;
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
