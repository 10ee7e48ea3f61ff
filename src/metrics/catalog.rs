//! Metric Catalog
//!
//! One getter per metric in the catalog. Each is a pure function of
//! `(store, scope id, params)` returning a [`MetricResult`]; the
//! registry wires them to paths and labels, and the API layer serializes
//! whatever comes back.
//!
//! Organization, product and project metrics that have no counter of
//! their own are computed by reducing over the repositories in scope;
//! the store resolves which repositories those are. Per-repository
//! queries fan out concurrently.

use crate::metrics::aggregate::aggregate;
use crate::metrics::derived;
use crate::metrics::error::{MetricError, MetricOutcome};
use crate::metrics::types::{mean, MetricParams, MetricResult, Reduction};
use crate::store::{CiStore, Window};
use futures_util::future::try_join_all;
use std::sync::Arc;

/// Counter series keys, matching what the collector writes
mod keys {
    pub const TOTAL_JOBS: &str = "total-jobs";
    pub const TOTAL_PASSED_JOBS: &str = "total-passed-jobs";
    pub const TOTAL_FAILED_JOBS: &str = "total-failed-jobs";

    pub fn repo_jobs(rid: &str) -> String {
        format!("total-repo-jobs:{rid}")
    }

    pub fn repo_passed_jobs(rid: &str) -> String {
        format!("total-passed-repo-jobs:{rid}")
    }

    pub fn repo_failed_jobs(rid: &str) -> String {
        format!("total-failed-repo-jobs:{rid}")
    }

    pub fn product_jobs(id: &str) -> String {
        format!("total-product-jobs:{id}")
    }

    pub fn product_passed_jobs(id: &str) -> String {
        format!("total-passed-product-jobs:{id}")
    }

    pub fn product_failed_jobs(id: &str) -> String {
        format!("total-failed-product-jobs:{id}")
    }

    pub fn project_jobs(id: &str) -> String {
        format!("total-project-jobs:{id}")
    }

    pub fn project_passed_jobs(id: &str) -> String {
        format!("total-passed-project-jobs:{id}")
    }

    pub fn project_failed_jobs(id: &str) -> String {
        format!("total-failed-project-jobs:{id}")
    }
}

// ============================================
// Scope resolution helpers
// ============================================

/// Repositories of a product: its projects flat-mapped to their
/// repositories
async fn product_repositories(
    store: &dyn CiStore,
    id: &str,
) -> Result<Vec<String>, MetricError> {
    let projects = store.product_projects(id).await?;
    let lists = try_join_all(projects.iter().map(|p| store.project_repositories(p))).await?;
    Ok(lists.into_iter().flatten().collect())
}

/// Total build count across a set of repositories
async fn builds_in(store: &dyn CiStore, repos: &[String]) -> Result<usize, MetricError> {
    let lists = try_join_all(repos.iter().map(|rid| store.repo_builds(rid))).await?;
    Ok(lists.iter().map(|builds| builds.len()).sum())
}

/// Classify every build as passed or failed within the window.
///
/// Passed means the store reports a last-passed execution in range;
/// failed is the complement, including the store's "never passed"
/// answer. Every build lands in exactly one of the two counts.
async fn classify_builds(
    store: &dyn CiStore,
    window: Window,
) -> Result<(usize, usize), MetricError> {
    let builds = store.builds().await?;
    let passes = try_join_all(
        builds
            .iter()
            .map(|build| store.last_passed_execution(build, window)),
    )
    .await?;

    let passed = passes.iter().filter(|p| p.is_some()).count();
    Ok((passed, passes.len() - passed))
}

/// Per-repository build times with undefined entries dropped
async fn defined_build_times(
    store: &dyn CiStore,
    window: Window,
) -> Result<Vec<f64>, MetricError> {
    let repos = store.repositories().await?;
    let times = try_join_all(repos.iter().map(|rid| store.repo_build_time(rid, window))).await?;
    Ok(times.into_iter().flatten().collect())
}

// ============================================
// Organization metrics
// ============================================

/// Total number of known builds
pub async fn total_builds(store: Arc<dyn CiStore>, _params: MetricParams) -> MetricOutcome {
    let builds = store.builds().await?;
    Ok(MetricResult::single(builds.len() as f64))
}

/// Average build count per repository
pub async fn avg_builds(store: Arc<dyn CiStore>, _params: MetricParams) -> MetricOutcome {
    let repos = store.repositories().await?;
    let lists = try_join_all(repos.iter().map(|rid| store.repo_builds(rid))).await?;
    let counts: Vec<f64> = lists.iter().map(|builds| builds.len() as f64).collect();
    Ok(MetricResult::from_option(mean(&counts)))
}

/// Execution count series for the whole organization
pub async fn total_executions(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        keys::TOTAL_JOBS,
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Builds whose last execution in range passed
pub async fn total_passed_builds(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let (passed, _) = classify_builds(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::single(passed as f64))
}

/// Builds with no passing execution in range
pub async fn total_failed_builds(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let (_, failed) = classify_builds(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::single(failed as f64))
}

/// Passing execution count series for the whole organization
pub async fn total_passed_executions(
    store: Arc<dyn CiStore>,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        keys::TOTAL_PASSED_JOBS,
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Failing execution count series for the whole organization
pub async fn total_failed_executions(
    store: Arc<dyn CiStore>,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        keys::TOTAL_FAILED_JOBS,
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Total build duration across all repositories.
///
/// Repositories with no recorded build time are skipped; with none
/// defined anywhere the total is a plain 0.
pub async fn total_build_time(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let times = defined_build_times(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::single(times.into_iter().sum()))
}

/// Average build duration per repository, excluding repositories with
/// no recorded build time
pub async fn avg_build_time(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let times = defined_build_times(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::from_option(mean(&times)))
}

/// Cumulative broken time across all repositories
pub async fn total_broken_time(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let total = derived::total_broken_time(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::single(total))
}

/// Organization time-to-fix: average of per-repository averages
pub async fn time_to_fix(store: Arc<dyn CiStore>, params: MetricParams) -> MetricOutcome {
    let value = derived::avg_time_to_fix(store.as_ref(), params.range.resolve()).await?;
    Ok(MetricResult::from_option(value))
}

// ============================================
// Repository metrics
// ============================================

/// Build count for one repository
pub async fn repo_builds(
    store: Arc<dyn CiStore>,
    rid: String,
    _params: MetricParams,
) -> MetricOutcome {
    let builds = store.repo_builds(&rid).await?;
    Ok(MetricResult::single(builds.len() as f64))
}

/// Execution count series for one repository
pub async fn repo_executions(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::repo_jobs(&rid),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Average executions per bucket group for one repository
pub async fn avg_repo_executions(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::repo_jobs(&rid),
        params.range,
        params.max_points,
        Reduction::Avg,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Passing execution count series for one repository
pub async fn passed_repo_executions(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::repo_passed_jobs(&rid),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Failing execution count series for one repository
pub async fn failed_repo_executions(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::repo_failed_jobs(&rid),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Build duration for one repository; undefined becomes the empty
/// sentinel
pub async fn repo_build_time(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let total = store.repo_build_time(&rid, params.range.resolve()).await?;
    Ok(MetricResult::from_option(total))
}

/// Broken time for one repository, echoing the resolved bounds
pub async fn repo_broken_time(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let window = params.range.resolve();
    let value = derived::repo_broken_time(store.as_ref(), &rid, window).await?;
    Ok(MetricResult::single(value).with_window(window))
}

/// Time-to-fix for one repository
pub async fn repo_time_to_fix(
    store: Arc<dyn CiStore>,
    rid: String,
    params: MetricParams,
) -> MetricOutcome {
    let value = derived::repo_time_to_fix(store.as_ref(), &rid, params.range.resolve()).await?;
    Ok(MetricResult::from_option(value))
}

// ============================================
// Product metrics
// ============================================

/// Build count across every repository of a product
pub async fn product_builds(
    store: Arc<dyn CiStore>,
    id: String,
    _params: MetricParams,
) -> MetricOutcome {
    let repos = product_repositories(store.as_ref(), &id).await?;
    let total = builds_in(store.as_ref(), &repos).await?;
    Ok(MetricResult::single(total as f64))
}

/// Execution count series for a product
pub async fn product_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::product_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Passing execution count series for a product
pub async fn passed_product_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::product_passed_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Failing execution count series for a product
pub async fn failed_product_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::product_failed_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

// ============================================
// Project metrics
// ============================================

/// Build count across every repository of a project
pub async fn project_builds(
    store: Arc<dyn CiStore>,
    id: String,
    _params: MetricParams,
) -> MetricOutcome {
    let repos = store.project_repositories(&id).await?;
    let total = builds_in(store.as_ref(), &repos).await?;
    Ok(MetricResult::single(total as f64))
}

/// Execution count series for a project
pub async fn project_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::project_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Passing execution count series for a project
pub async fn passed_project_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::project_passed_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

/// Failing execution count series for a project
pub async fn failed_project_executions(
    store: Arc<dyn CiStore>,
    id: String,
    params: MetricParams,
) -> MetricOutcome {
    let series = aggregate(
        store.as_ref(),
        &keys::project_failed_jobs(&id),
        params.range,
        params.max_points,
        Reduction::Sum,
    )
    .await?;
    Ok(MetricResult::series(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::TimeRange;
    use crate::store::{Execution, MemoryStore};

    fn params(begin: i64, end: i64) -> MetricParams {
        MetricParams::new(TimeRange::between(begin, end), None)
    }

    /// Three repositories, five builds, a product/project hierarchy and
    /// some counter data
    fn fixture() -> Arc<dyn CiStore> {
        let mut store = MemoryStore::with_bucket_secs(100);

        store.add_build("repo-a", "a-1");
        store.add_build("repo-a", "a-2");
        store.add_build("repo-b", "b-1");
        store.add_build("repo-b", "b-2");
        store.add_build("repo-c", "c-1");

        // a-1 passes, a-2 never passes, b-1 fails then recovers,
        // b-2 passes early, c-1 has no executions at all
        store.record_execution("a-1", Execution::passed(100).duration(10.0));
        store.record_execution("a-2", Execution::failed(150).duration(5.0));
        store.record_execution("b-2", Execution::passed(150).duration(6.0));
        store.record_execution("b-1", Execution::failed(200).duration(8.0));
        store.record_execution("b-1", Execution::passed(500).duration(12.0));

        store.link_product("prod", &["proj-1", "proj-2"]);
        store.link_project("proj-1", &["repo-a"]);
        store.link_project("proj-2", &["repo-b", "repo-c"]);

        store.record_count(keys::TOTAL_JOBS, 100, 3.0);
        store.record_count(keys::TOTAL_JOBS, 200, 2.0);
        store.record_count(keys::TOTAL_PASSED_JOBS, 100, 2.0);
        store.record_count(keys::TOTAL_FAILED_JOBS, 100, 1.0);
        store.record_count(keys::repo_jobs("repo-a"), 100, 2.0);
        store.record_count(keys::product_jobs("prod"), 100, 5.0);
        store.record_count(keys::project_jobs("proj-2"), 100, 3.0);

        Arc::new(store)
    }

    #[tokio::test]
    async fn test_total_and_repo_builds() {
        let store = fixture();

        let result = total_builds(store.clone(), params(0, 1000)).await.unwrap();
        assert_eq!(result.series, vec![5.0]);

        let result = repo_builds(store.clone(), "repo-a".into(), params(0, 1000))
            .await
            .unwrap();
        assert_eq!(result.series, vec![2.0]);

        // Unknown repository: zero builds, not an error
        let result = repo_builds(store, "nope".into(), params(0, 1000))
            .await
            .unwrap();
        assert_eq!(result.series, vec![0.0]);
    }

    #[tokio::test]
    async fn test_avg_builds() {
        let store = fixture();

        // (2 + 2 + 1) / 3
        let result = avg_builds(store, params(0, 1000)).await.unwrap();
        assert!((result.series[0] - 5.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_avg_builds_no_repositories_is_empty() {
        let store: Arc<dyn CiStore> = Arc::new(MemoryStore::new());

        let result = avg_builds(store, params(0, 1000)).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_passed_plus_failed_equals_total() {
        let store = fixture();
        let p = params(0, 1000);

        let total = total_builds(store.clone(), p).await.unwrap().series[0];
        let passed = total_passed_builds(store.clone(), p).await.unwrap().series[0];
        let failed = total_failed_builds(store, p).await.unwrap().series[0];

        // a-1, b-1, b-2 passed; a-2 and c-1 did not
        assert_eq!(passed, 3.0);
        assert_eq!(failed, 2.0);
        assert_eq!(passed + failed, total);
    }

    #[tokio::test]
    async fn test_pass_fail_classification_respects_window() {
        let store = fixture();
        // Before b-1's recovery at 500
        let p = params(0, 400);

        let passed = total_passed_builds(store.clone(), p).await.unwrap().series[0];
        let failed = total_failed_builds(store, p).await.unwrap().series[0];
        assert_eq!(passed, 2.0);
        assert_eq!(failed, 3.0);
    }

    #[tokio::test]
    async fn test_execution_counters() {
        let store = fixture();

        let result = total_executions(store.clone(), params(0, 1000)).await.unwrap();
        assert_eq!(result.series, vec![3.0, 2.0]);

        let result = total_passed_executions(store.clone(), params(0, 1000))
            .await
            .unwrap();
        assert_eq!(result.series, vec![2.0]);

        let result = repo_executions(store.clone(), "repo-a".into(), params(0, 1000))
            .await
            .unwrap();
        assert_eq!(result.series, vec![2.0]);

        // No counter recorded for repo-b
        let result = repo_executions(store, "repo-b".into(), params(0, 1000))
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_build_time_skips_undefined_repositories() {
        let store = fixture();
        // repo-a: 10 + 5, repo-b: 8 + 12 + 6, repo-c: undefined
        let p = params(0, 1000);

        let total = total_build_time(store.clone(), p).await.unwrap();
        assert_eq!(total.series, vec![41.0]);

        let avg = avg_build_time(store.clone(), p).await.unwrap();
        assert_eq!(avg.series, vec![20.5]);

        let single = repo_build_time(store.clone(), "repo-c".into(), p).await.unwrap();
        assert!(single.is_empty());
    }

    #[tokio::test]
    async fn test_build_time_all_undefined() {
        let mut store = MemoryStore::new();
        store.add_repository("repo-a");
        let store: Arc<dyn CiStore> = Arc::new(store);
        let p = params(0, 1000);

        // Sum degrades to zero, average to the sentinel
        let total = total_build_time(store.clone(), p).await.unwrap();
        assert_eq!(total.series, vec![0.0]);

        let avg = avg_build_time(store, p).await.unwrap();
        assert!(avg.is_empty());
    }

    #[tokio::test]
    async fn test_broken_time_metrics() {
        let store = fixture();
        let p = params(0, 1000);

        // repo-a breaks at 150 and never recovers (850s in window);
        // repo-b breaks at 200 and recovers at 500 (300s)
        let total = total_broken_time(store.clone(), p).await.unwrap();
        assert_eq!(total.series, vec![850.0 + 300.0]);

        let repo = repo_broken_time(store.clone(), "repo-b".into(), p).await.unwrap();
        assert_eq!(repo.series, vec![300.0]);
        assert_eq!(repo.metadata["begin"], serde_json::json!(0));
        assert_eq!(repo.metadata["end"], serde_json::json!(1000));

        // Unbroken repository reports a plain zero, not "no data"
        let repo = repo_broken_time(store, "repo-c".into(), p).await.unwrap();
        assert_eq!(repo.series, vec![0.0]);
    }

    #[tokio::test]
    async fn test_time_to_fix_metrics() {
        let store = fixture();
        let p = params(0, 1000);

        // Only repo-b was ever fixed: 500 - 200
        let repo = repo_time_to_fix(store.clone(), "repo-b".into(), p).await.unwrap();
        assert_eq!(repo.series, vec![300.0]);

        let org = time_to_fix(store.clone(), p).await.unwrap();
        assert_eq!(org.series, vec![300.0]);

        // repo-a never recovered
        let repo = repo_time_to_fix(store, "repo-a".into(), p).await.unwrap();
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_product_and_project_builds() {
        let store = fixture();
        let p = params(0, 1000);

        // prod spans all three repositories
        let result = product_builds(store.clone(), "prod".into(), p).await.unwrap();
        assert_eq!(result.series, vec![5.0]);

        let result = project_builds(store.clone(), "proj-2".into(), p).await.unwrap();
        assert_eq!(result.series, vec![3.0]);

        // Unknown ids reduce over an empty scope
        let result = product_builds(store.clone(), "nope".into(), p).await.unwrap();
        assert_eq!(result.series, vec![0.0]);
        let result = project_builds(store, "nope".into(), p).await.unwrap();
        assert_eq!(result.series, vec![0.0]);
    }

    #[tokio::test]
    async fn test_product_and_project_executions() {
        let store = fixture();
        let p = params(0, 1000);

        let result = product_executions(store.clone(), "prod".into(), p).await.unwrap();
        assert_eq!(result.series, vec![5.0]);

        let result = project_executions(store.clone(), "proj-2".into(), p).await.unwrap();
        assert_eq!(result.series, vec![3.0]);

        let result = passed_product_executions(store, "prod".into(), p).await.unwrap();
        assert!(result.is_empty());
    }
}
