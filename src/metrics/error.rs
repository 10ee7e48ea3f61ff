//! Metric error types

use thiserror::Error;

/// Errors that can occur while computing a metric
#[derive(Error, Debug)]
pub enum MetricError {
    /// Store operation failed; propagated unchanged, no retries here
    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// `max_points` was present but not positive
    #[error("max_points must be a positive integer")]
    InvalidMaxPoints,

    /// A handler was invoked with the wrong scope kind
    #[error("Metric '{metric}' does not accept the given scope")]
    ScopeMismatch { metric: String },
}

/// Result type for metric computations
pub type MetricOutcome = Result<crate::metrics::MetricResult, MetricError>;
