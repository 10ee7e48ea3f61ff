//! # Cimetry
//!
//! Continuous-integration metrics catalog - build, execution and
//! stability metrics computed over a time-series data store, scoped to
//! the organization, a repository, a product or a project.
//!
//! ## Features
//!
//! - **Counter aggregation**: raw per-bucket counts downsampled to a
//!   requested number of points, with sum or average merging
//! - **Derived metrics**: broken time and time-to-fix computed from
//!   pass/fail execution history
//! - **Scope reduction**: organization/product/project values reduced
//!   concurrently over the repositories in scope
//! - **Explicit registry**: every metric registered once at startup and
//!   served through two generic endpoints
//!
//! ## Modules
//!
//! - [`store`]: Store trait the catalog reads from, plus the in-memory
//!   reference implementation
//! - [`metrics`]: Aggregation engine, derived metrics and the catalog
//! - [`registry`]: Metric registration table
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cimetry::metrics::{catalog, MetricParams, TimeRange};
//! use cimetry::store::{CiStore, Execution, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = MemoryStore::new();
//!     store.add_build("backend", "backend-nightly");
//!     store.record_execution("backend-nightly", Execution::passed(1_700_000_000));
//!
//!     let store: Arc<dyn CiStore> = Arc::new(store);
//!     let params = MetricParams::new(TimeRange::open(), None);
//!     let result = catalog::total_builds(store, params).await?;
//!
//!     println!("{} builds known", result.series[0]);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod metrics;
pub mod registry;
pub mod store;

// Re-export top-level types for convenience
pub use store::{CiStore, CounterSample, Execution, MemoryStore, StoreError, StoreResult, Window};

pub use metrics::{
    aggregate, MetricError, MetricOutcome, MetricParams, MetricResult, Reduction, Scope, TimeRange,
};

pub use registry::{MetricRoute, Registry, ScopeKind};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
