//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use crate::metrics::{MetricParams, MetricResult, TimeRange};
use crate::registry::MetricRoute;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query parameters accepted by every metric endpoint.
///
/// Validation is presence-level only: a parameter is either a parseable
/// integer or absent. Semantic checks (a positive `max`) happen in the
/// metric layer.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    /// Start timestamp (seconds), defaults to all history
    #[serde(default)]
    pub begin: Option<i64>,
    /// End timestamp (seconds), defaults to now
    #[serde(default)]
    pub end: Option<i64>,
    /// Maximum number of output points
    #[serde(default)]
    pub max: Option<usize>,
}

impl RangeQuery {
    /// Convert into the parameter struct the metric layer expects
    pub fn into_params(self) -> MetricParams {
        MetricParams::new(TimeRange::new(self.begin, self.end), self.max)
    }
}

/// Response for a metric endpoint
#[derive(Debug, Serialize)]
pub struct MetricResponse {
    /// Metric name (route path without the slash)
    pub metric: String,
    /// Unit label from the registration
    pub unit: String,
    /// Reduction label from the registration (`sum` / `avg`)
    pub aggregation: String,
    /// Optional display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Resolved-parameter echoes (empty for most metrics)
    pub metadata: HashMap<String, serde_json::Value>,
    /// The numeric series; empty means "no data"
    pub series: Vec<f64>,
}

impl MetricResponse {
    /// Combine a registry entry and a computation result
    pub fn new(route: &MetricRoute, result: MetricResult) -> Self {
        Self {
            metric: route.name().to_string(),
            unit: route.unit.to_string(),
            aggregation: route.reduction.label().to_string(),
            title: route.title.map(|t| t.to_string()),
            metadata: result.metadata,
            series: result.series,
        }
    }
}

/// One entry in the metric listing
#[derive(Debug, Serialize)]
pub struct MetricInfo {
    pub metric: String,
    pub scope: String,
    pub unit: String,
    pub aggregation: String,
}

/// Response for the metric listing endpoint
#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub total: usize,
    pub metrics: Vec<MetricInfo>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub metrics_registered: usize,
}
