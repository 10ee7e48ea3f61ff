//! In-Memory Store
//!
//! Reference [`CiStore`] implementation backed by plain maps. Used by the
//! dev server binary, the test suites, and the benches. Holds execution
//! history per build and derives broken time / time-to-fix from it, the
//! same contract a production backend fulfils from its own records.
//!
//! The store is populated up front through the builder-style `add_*` /
//! `record_*` methods and then shared behind an `Arc`; trait reads never
//! mutate, so no locking is needed.

use super::{CiStore, CounterSample, StoreResult, Window};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

/// Default counter bucket width: one hour
const DEFAULT_BUCKET_SECS: i64 = 3600;

/// One recorded execution of a build
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Execution {
    /// When the execution finished, seconds since epoch
    pub timestamp: i64,
    /// Whether the execution passed
    pub passed: bool,
    /// Wall-clock duration of the execution, in seconds
    pub duration: f64,
}

impl Execution {
    /// Create a passing execution
    pub fn passed(timestamp: i64) -> Self {
        Self {
            timestamp,
            passed: true,
            duration: 0.0,
        }
    }

    /// Create a failing execution
    pub fn failed(timestamp: i64) -> Self {
        Self {
            timestamp,
            passed: false,
            duration: 0.0,
        }
    }

    /// Builder method: set the execution duration
    pub fn duration(mut self, secs: f64) -> Self {
        self.duration = secs;
        self
    }
}

/// In-memory CI store
#[derive(Debug)]
pub struct MemoryStore {
    repositories: Vec<String>,
    builds: Vec<String>,
    repo_builds: HashMap<String, Vec<String>>,
    executions: HashMap<String, Vec<Execution>>,
    products: HashMap<String, Vec<String>>,
    projects: HashMap<String, Vec<String>>,
    counters: HashMap<String, BTreeMap<i64, f64>>,
    bucket_secs: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with the default one-hour counter buckets
    pub fn new() -> Self {
        Self::with_bucket_secs(DEFAULT_BUCKET_SECS)
    }

    /// Create an empty store with a custom counter bucket width
    pub fn with_bucket_secs(bucket_secs: i64) -> Self {
        Self {
            repositories: Vec::new(),
            builds: Vec::new(),
            repo_builds: HashMap::new(),
            executions: HashMap::new(),
            products: HashMap::new(),
            projects: HashMap::new(),
            counters: HashMap::new(),
            bucket_secs,
        }
    }

    /// Register a repository
    pub fn add_repository(&mut self, rid: impl Into<String>) {
        let rid = rid.into();
        if !self.repositories.contains(&rid) {
            self.repo_builds.entry(rid.clone()).or_default();
            self.repositories.push(rid);
        }
    }

    /// Register a build under a repository (registers the repository too)
    pub fn add_build(&mut self, rid: impl Into<String>, build: impl Into<String>) {
        let rid = rid.into();
        let build = build.into();
        self.add_repository(rid.clone());
        if !self.builds.contains(&build) {
            self.builds.push(build.clone());
        }
        let builds = self.repo_builds.entry(rid).or_default();
        if !builds.contains(&build) {
            builds.push(build);
        }
    }

    /// Record an execution of a build
    pub fn record_execution(&mut self, build: impl Into<String>, execution: Execution) {
        let history = self.executions.entry(build.into()).or_default();
        history.push(execution);
        history.sort_by_key(|e| e.timestamp);
    }

    /// Add `amount` to a counter series at the bucket containing `timestamp`
    pub fn record_count(&mut self, key: impl Into<String>, timestamp: i64, amount: f64) {
        let bucket = self.bucket_of(timestamp);
        *self
            .counters
            .entry(key.into())
            .or_default()
            .entry(bucket)
            .or_insert(0.0) += amount;
    }

    /// Declare the projects belonging to a product
    pub fn link_product(&mut self, product: impl Into<String>, projects: &[&str]) {
        self.products
            .entry(product.into())
            .or_default()
            .extend(projects.iter().map(|p| p.to_string()));
    }

    /// Declare the repositories belonging to a project
    pub fn link_project(&mut self, project: impl Into<String>, repos: &[&str]) {
        self.projects
            .entry(project.into())
            .or_default()
            .extend(repos.iter().map(|r| r.to_string()));
    }

    fn bucket_of(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.bucket_secs)
    }

    /// Full execution history of a repository across all of its builds,
    /// in timestamp order
    fn repo_executions(&self, rid: &str) -> Vec<Execution> {
        let mut history: Vec<Execution> = self
            .repo_builds
            .get(rid)
            .into_iter()
            .flatten()
            .filter_map(|build| self.executions.get(build))
            .flatten()
            .copied()
            .collect();
        history.sort_by_key(|e| e.timestamp);
        history
    }

    /// Intervals during which the repository's latest execution was a
    /// failure: `(broke_at, fixed_at)`, with `fixed_at = None` when the
    /// breakage was never repaired.
    fn broken_intervals(&self, rid: &str) -> Vec<(i64, Option<i64>)> {
        let mut intervals = Vec::new();
        let mut broke_at: Option<i64> = None;

        for execution in self.repo_executions(rid) {
            match (broke_at, execution.passed) {
                (None, false) => broke_at = Some(execution.timestamp),
                (Some(start), true) => {
                    intervals.push((start, Some(execution.timestamp)));
                    broke_at = None;
                }
                _ => {}
            }
        }

        if let Some(start) = broke_at {
            intervals.push((start, None));
        }

        intervals
    }
}

#[async_trait]
impl CiStore for MemoryStore {
    async fn builds(&self) -> StoreResult<Vec<String>> {
        Ok(self.builds.clone())
    }

    async fn repositories(&self) -> StoreResult<Vec<String>> {
        Ok(self.repositories.clone())
    }

    async fn repo_builds(&self, rid: &str) -> StoreResult<Vec<String>> {
        Ok(self.repo_builds.get(rid).cloned().unwrap_or_default())
    }

    async fn last_passed_execution(
        &self,
        build: &str,
        window: Window,
    ) -> StoreResult<Option<i64>> {
        Ok(self
            .executions
            .get(build)
            .into_iter()
            .flatten()
            .filter(|e| e.passed && window.contains(e.timestamp))
            .map(|e| e.timestamp)
            .max())
    }

    async fn repo_build_time(&self, rid: &str, window: Window) -> StoreResult<Option<f64>> {
        let durations: Vec<f64> = self
            .repo_executions(rid)
            .into_iter()
            .filter(|e| window.contains(e.timestamp))
            .map(|e| e.duration)
            .collect();

        if durations.is_empty() {
            return Ok(None);
        }
        Ok(Some(durations.into_iter().sum()))
    }

    async fn broken_time(&self, rid: &str, window: Window) -> StoreResult<f64> {
        let total: i64 = self
            .broken_intervals(rid)
            .into_iter()
            .map(|(start, fixed)| window.overlap(start, fixed.unwrap_or(window.end)))
            .sum();
        Ok(total as f64)
    }

    async fn time_to_fix(&self, rid: &str, window: Window) -> StoreResult<Option<f64>> {
        let latencies: Vec<f64> = self
            .broken_intervals(rid)
            .into_iter()
            .filter_map(|(start, fixed)| fixed.map(|f| (start, f)))
            .filter(|(_, fixed)| window.contains(*fixed))
            .map(|(start, fixed)| (fixed - start) as f64)
            .collect();

        if latencies.is_empty() {
            return Ok(None);
        }
        Ok(Some(latencies.iter().sum::<f64>() / latencies.len() as f64))
    }

    async fn product_projects(&self, id: &str) -> StoreResult<Vec<String>> {
        Ok(self.products.get(id).cloned().unwrap_or_default())
    }

    async fn project_repositories(&self, id: &str) -> StoreResult<Vec<String>> {
        Ok(self.projects.get(id).cloned().unwrap_or_default())
    }

    async fn read_counter(&self, key: &str, window: Window) -> StoreResult<Vec<CounterSample>> {
        if window.begin > window.end {
            return Ok(Vec::new());
        }

        let series = match self.counters.get(key) {
            Some(series) => series,
            None => return Ok(Vec::new()),
        };

        // The lattice spans the recorded buckets in range; gaps between
        // them surface as None samples.
        let from = self.bucket_of(window.begin);
        let mut recorded = series.range(from..=window.end);

        let first = match recorded.next() {
            Some((bucket, _)) => *bucket,
            None => return Ok(Vec::new()),
        };
        let last = recorded.next_back().map(|(b, _)| *b).unwrap_or(first);

        let mut samples = Vec::new();
        let mut bucket = first;
        while bucket <= last {
            samples.push(CounterSample::new(bucket, series.get(&bucket).copied()));
            bucket += self.bucket_secs;
        }
        Ok(samples)
    }
}
