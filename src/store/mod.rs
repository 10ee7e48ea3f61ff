//! Store Abstraction
//!
//! The metrics catalog never talks to a storage backend directly; every
//! read goes through the [`CiStore`] trait. A production deployment
//! implements it against the real time-series store, tests and the dev
//! server use the in-memory [`MemoryStore`].
//!
//! All store operations take a fully resolved [`Window`] - open-ended
//! ranges are resolved by the caller before they reach this layer.

mod memory;

pub use memory::{Execution, MemoryStore};

use async_trait::async_trait;
use thiserror::Error;

/// A fully resolved time window (closed interval `[begin, end]`).
///
/// Timestamps are seconds since the Unix epoch, UTC. Unlike
/// [`TimeRange`](crate::metrics::TimeRange), a `Window` has no open
/// bounds; it is the only range type store operations accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Start timestamp (inclusive), in seconds
    pub begin: i64,
    /// End timestamp (inclusive), in seconds
    pub end: i64,
}

impl Window {
    /// Create a new window
    pub fn new(begin: i64, end: i64) -> Self {
        Self { begin, end }
    }

    /// Check if a timestamp falls within this window
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.begin && timestamp <= self.end
    }

    /// Overlap between `[start, end]` and this window, in seconds.
    ///
    /// Zero when the interval lies entirely outside the window.
    pub fn overlap(&self, start: i64, end: i64) -> i64 {
        (end.min(self.end) - start.max(self.begin)).max(0)
    }
}

/// One bucket of a counter series.
///
/// `value` is `None` when nothing was recorded in that bucket - "no data"
/// is distinct from an explicit zero count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSample {
    /// Bucket start timestamp, in seconds
    pub bucket: i64,
    /// Recorded count, if any
    pub value: Option<f64>,
}

impl CounterSample {
    pub fn new(bucket: i64, value: Option<f64>) -> Self {
        Self { bucket, value }
    }
}

/// Read-only interface to the CI time-series store.
///
/// Identifier-returning operations resolve unknown ids to empty
/// collections rather than errors; the reduction logic above this layer
/// treats an empty scope as "no data". Backend failures surface as
/// [`StoreError`] and propagate unchanged - no retries happen here.
#[async_trait]
pub trait CiStore: Send + Sync {
    /// All known build identifiers
    async fn builds(&self) -> StoreResult<Vec<String>>;

    /// All known repository ids
    async fn repositories(&self) -> StoreResult<Vec<String>>;

    /// Build identifiers belonging to a repository
    async fn repo_builds(&self, rid: &str) -> StoreResult<Vec<String>>;

    /// Timestamp of the last passing execution of a build within the
    /// window, or `None` when the build never passed in range
    async fn last_passed_execution(&self, build: &str, window: Window)
        -> StoreResult<Option<i64>>;

    /// Total build duration for a repository within the window, in
    /// seconds. `None` when no executions ran in range (undefined, not
    /// zero).
    async fn repo_build_time(&self, rid: &str, window: Window) -> StoreResult<Option<f64>>;

    /// Cumulative time the repository's build stayed broken within the
    /// window, in seconds. Exactly `0` for an unbroken history.
    async fn broken_time(&self, rid: &str, window: Window) -> StoreResult<f64>;

    /// Average latency between a breakage and the subsequent fix within
    /// the window, in seconds. `None` when nothing was fixed in range.
    async fn time_to_fix(&self, rid: &str, window: Window) -> StoreResult<Option<f64>>;

    /// Project ids belonging to a product
    async fn product_projects(&self, id: &str) -> StoreResult<Vec<String>>;

    /// Repository ids belonging to a project
    async fn project_repositories(&self, id: &str) -> StoreResult<Vec<String>>;

    /// Per-bucket values for a counter series within the window, in
    /// bucket order. Buckets with no recorded count carry `None`.
    async fn read_counter(&self, key: &str, window: Window) -> StoreResult<Vec<CounterSample>>;
}

/// Errors reported by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend returned data this layer cannot interpret
    #[error("Malformed store response for '{key}': {reason}")]
    Malformed { key: String, reason: String },

    /// IO error from the backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_contains() {
        let window = Window::new(1000, 2000);

        assert!(!window.contains(999));
        assert!(window.contains(1000));
        assert!(window.contains(1500));
        assert!(window.contains(2000));
        assert!(!window.contains(2001));
    }

    #[test]
    fn test_window_overlap() {
        let window = Window::new(1000, 2000);

        // Fully inside
        assert_eq!(window.overlap(1200, 1500), 300);
        // Clipped at both ends
        assert_eq!(window.overlap(500, 2500), 1000);
        // Clipped at the start
        assert_eq!(window.overlap(800, 1300), 300);
        // Entirely outside
        assert_eq!(window.overlap(2500, 3000), 0);
        assert_eq!(window.overlap(100, 900), 0);
    }
}
