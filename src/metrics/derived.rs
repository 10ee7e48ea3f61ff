//! Derived Metrics
//!
//! Broken time and time-to-fix are not simple counter reads; the store
//! derives them from the pass/fail execution history of a repository,
//! and this module reduces the per-repository values for broader scopes.
//!
//! Both computations require resolved bounds - callers resolve the
//! request range before anything here runs. Per-repository store queries
//! are independent and issued concurrently; the reductions are
//! commutative, so completion order does not affect the result.

use crate::metrics::error::MetricError;
use crate::metrics::types::mean;
use crate::store::{CiStore, Window};
use futures_util::future::try_join_all;

/// Cumulative broken time for one repository within the window.
///
/// Zero for an unbroken history - a repository that always passed has a
/// well-defined broken time of 0, not "no data".
pub async fn repo_broken_time(
    store: &dyn CiStore,
    rid: &str,
    window: Window,
) -> Result<f64, MetricError> {
    Ok(store.broken_time(rid, window).await?)
}

/// Sum of broken time across every repository in the organization
pub async fn total_broken_time(store: &dyn CiStore, window: Window) -> Result<f64, MetricError> {
    let repos = store.repositories().await?;
    let times = try_join_all(repos.iter().map(|rid| store.broken_time(rid, window))).await?;
    Ok(times.into_iter().sum())
}

/// Average time-to-fix for one repository, `None` when nothing was
/// fixed within the window
pub async fn repo_time_to_fix(
    store: &dyn CiStore,
    rid: &str,
    window: Window,
) -> Result<Option<f64>, MetricError> {
    Ok(store.time_to_fix(rid, window).await?)
}

/// Organization-level time-to-fix: the average of each repository's own
/// average. Repositories with no fix history are excluded; with no
/// qualifying repository at all the result is `None`.
///
/// This is deliberately an average of averages rather than a pooled
/// weighted mean - changing it would change reported values.
pub async fn avg_time_to_fix(
    store: &dyn CiStore,
    window: Window,
) -> Result<Option<f64>, MetricError> {
    let repos = store.repositories().await?;
    let latencies = try_join_all(repos.iter().map(|rid| store.time_to_fix(rid, window))).await?;

    let defined: Vec<f64> = latencies.into_iter().flatten().collect();
    Ok(mean(&defined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Execution, MemoryStore};

    fn fixture() -> MemoryStore {
        let mut store = MemoryStore::new();
        // repo-a: broken 100..300, fixed after 200s
        store.add_build("repo-a", "a-1");
        store.record_execution("a-1", Execution::failed(100));
        store.record_execution("a-1", Execution::passed(300));
        // repo-b: broken 500..900, fixed after 400s
        store.add_build("repo-b", "b-1");
        store.record_execution("b-1", Execution::failed(500));
        store.record_execution("b-1", Execution::passed(900));
        // repo-c: never broken
        store.add_build("repo-c", "c-1");
        store.record_execution("c-1", Execution::passed(50));
        store
    }

    #[tokio::test]
    async fn test_total_broken_time_sums_repositories() {
        let store = fixture();
        let window = Window::new(0, 1000);

        // 200 + 400 + 0
        assert_eq!(total_broken_time(&store, window).await.unwrap(), 600.0);
    }

    #[tokio::test]
    async fn test_total_broken_time_no_repositories() {
        let store = MemoryStore::new();
        let window = Window::new(0, 1000);

        assert_eq!(total_broken_time(&store, window).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_repo_broken_time_unbroken_is_zero() {
        let store = fixture();
        let window = Window::new(0, 1000);

        assert_eq!(
            repo_broken_time(&store, "repo-c", window).await.unwrap(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_avg_time_to_fix_averages_repo_averages() {
        let store = fixture();
        let window = Window::new(0, 1000);

        // repo-a: 200, repo-b: 400, repo-c excluded (never fixed)
        assert_eq!(
            avg_time_to_fix(&store, window).await.unwrap(),
            Some(300.0)
        );
    }

    #[tokio::test]
    async fn test_avg_time_to_fix_no_fixes_is_none() {
        let mut store = MemoryStore::new();
        store.add_build("repo-a", "a-1");
        store.record_execution("a-1", Execution::passed(100));

        let window = Window::new(0, 1000);
        assert_eq!(avg_time_to_fix(&store, window).await.unwrap(), None);
    }
}
