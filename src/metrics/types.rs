//! Core metric types
//!
//! This module defines the types shared by every metric computation:
//! - `TimeRange`: a possibly open-ended request range
//! - `Reduction`: the aggregation policies (sum, average)
//! - `Scope`: which entity a metric is computed for
//! - `MetricResult`: the single result shape every getter returns

use crate::store::Window;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

/// A request time range with optional bounds.
///
/// `begin = None` means "from the beginning of recorded history" and
/// `end = None` means "up to now". Resolution to concrete bounds happens
/// in exactly one place, [`TimeRange::resolve`]; components that require
/// concrete bounds take a [`Window`] and never see an open range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive, seconds), or `None` for "all history"
    pub begin: Option<i64>,
    /// End timestamp (inclusive, seconds), or `None` for "now"
    pub end: Option<i64>,
}

impl TimeRange {
    /// Create a range from optional bounds
    pub fn new(begin: Option<i64>, end: Option<i64>) -> Self {
        Self { begin, end }
    }

    /// A fully open range: all recorded history up to now
    pub fn open() -> Self {
        Self::default()
    }

    /// A fully bounded range
    pub fn between(begin: i64, end: i64) -> Self {
        Self {
            begin: Some(begin),
            end: Some(end),
        }
    }

    /// Resolve open bounds: `begin` falls back to epoch 0, `end` to the
    /// current UTC time at second precision.
    pub fn resolve(&self) -> Window {
        Window {
            begin: self.begin.unwrap_or(0),
            end: self.end.unwrap_or_else(|| Utc::now().timestamp()),
        }
    }
}

/// Aggregation policy applied when merging values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Add values
    Sum,
    /// Arithmetic mean
    Avg,
}

impl Reduction {
    /// Apply this reduction to a slice of values.
    ///
    /// `Avg` over an empty slice is undefined and yields `None`; `Sum`
    /// over an empty slice is a well-defined zero.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Reduction::Sum => Some(values.iter().sum()),
            Reduction::Avg => mean(values),
        }
    }

    /// Label used in response metadata
    pub fn label(&self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Avg => "avg",
        }
    }
}

impl std::fmt::Display for Reduction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Arithmetic mean of a slice, `None` when the slice is empty.
///
/// Callers skip undefined entries before calling; an empty slice is the
/// "no data" case, never a divide-by-zero.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// The entity a metric is computed for.
///
/// Containment (a product contains projects, a project contains
/// repositories, the organization contains everything) is resolved by
/// the store, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The whole organization
    Org,
    /// A single repository
    Repo(String),
    /// A product (a set of projects)
    Product(String),
    /// A project (a set of repositories)
    Project(String),
}

/// Per-request parameters every metric getter receives
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricParams {
    /// Requested time range (possibly open-ended)
    pub range: TimeRange,
    /// Maximum number of output points; must be positive when present
    pub max_points: Option<usize>,
}

impl MetricParams {
    pub fn new(range: TimeRange, max_points: Option<usize>) -> Self {
        Self { range, max_points }
    }
}

/// Result of a metric computation.
///
/// `series` is the ordered numeric series; `metadata` echoes resolved
/// parameters for metrics whose effective range differs from the request.
/// An undefined value (average over an empty set, NaN from a duration
/// computation) is represented by an empty series - "no data" is
/// distinguished from zero, and NaN never reaches a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricResult {
    /// Resolved-parameter echoes, empty for most metrics
    pub metadata: HashMap<String, serde_json::Value>,
    /// Ordered numeric series
    pub series: Vec<f64>,
}

impl MetricResult {
    /// The "no data" sentinel: empty metadata, empty series
    pub fn empty() -> Self {
        Self::default()
    }

    /// A result carrying a full series
    pub fn series(series: Vec<f64>) -> Self {
        Self {
            metadata: HashMap::new(),
            series,
        }
    }

    /// A single-value result. NaN is the undefined case and collapses to
    /// the empty sentinel.
    pub fn single(value: f64) -> Self {
        if value.is_nan() {
            return Self::empty();
        }
        Self::series(vec![value])
    }

    /// `Some(v)` becomes a single-value result, `None` the empty sentinel
    pub fn from_option(value: Option<f64>) -> Self {
        value.map(Self::single).unwrap_or_else(Self::empty)
    }

    /// Attach the resolved window bounds to the metadata
    pub fn with_window(mut self, window: Window) -> Self {
        self.metadata.insert("begin".to_string(), json!(window.begin));
        self.metadata.insert("end".to_string(), json!(window.end));
        self
    }

    /// True when this is the "no data" sentinel
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_open_bounds() {
        let before = Utc::now().timestamp();
        let window = TimeRange::open().resolve();
        let after = Utc::now().timestamp();

        assert_eq!(window.begin, 0);
        assert!(window.end >= before && window.end <= after);
    }

    #[test]
    fn test_resolve_keeps_explicit_bounds() {
        let window = TimeRange::between(100, 200).resolve();
        assert_eq!(window, Window::new(100, 200));

        let window = TimeRange::new(Some(100), None).resolve();
        assert_eq!(window.begin, 100);
    }

    #[test]
    fn test_reduction_apply() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(Reduction::Sum.apply(&values), Some(10.0));
        assert_eq!(Reduction::Avg.apply(&values), Some(2.5));

        // Sum of nothing is zero, average of nothing is undefined
        assert_eq!(Reduction::Sum.apply(&[]), Some(0.0));
        assert_eq!(Reduction::Avg.apply(&[]), None);
    }

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn test_single_collapses_nan() {
        assert_eq!(MetricResult::single(f64::NAN), MetricResult::empty());
        assert_eq!(MetricResult::single(0.0).series, vec![0.0]);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(MetricResult::from_option(None), MetricResult::empty());
        assert_eq!(MetricResult::from_option(Some(7.0)).series, vec![7.0]);
        // A NaN smuggled through an Option still collapses
        assert_eq!(
            MetricResult::from_option(Some(f64::NAN)),
            MetricResult::empty()
        );
    }

    #[test]
    fn test_with_window_echoes_bounds() {
        let result = MetricResult::single(1.0).with_window(Window::new(5, 99));
        assert_eq!(result.metadata["begin"], json!(5));
        assert_eq!(result.metadata["end"], json!(99));
    }

    #[test]
    fn test_serialization_shape() {
        let result = MetricResult::single(3.0).with_window(Window::new(0, 10));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["series"], json!([3.0]));
        assert_eq!(value["metadata"]["begin"], json!(0));
    }
}
