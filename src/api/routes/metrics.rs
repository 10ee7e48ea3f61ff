//! Metric Routes
//!
//! Generic endpoints dispatching through the registry:
//!
//! - GET /metrics - list registered metrics
//! - GET /metrics/:metric - organization-scoped metric
//! - GET /metrics/:metric/:id - repository/product/project metric
//!
//! Which entity kind `:id` names is decided by the registration, not the
//! URL; asking an organization metric with an id (or a scoped metric
//! without one) is a 404, the same as an unknown metric name.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{MetricInfo, MetricListResponse, MetricResponse, RangeQuery};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::metrics::Scope;
use crate::registry::{MetricRoute, ScopeKind};

/// GET /metrics
///
/// List every registered metric with its scope, unit and reduction.
pub async fn list_metrics(State(state): State<Arc<AppState>>) -> Json<MetricListResponse> {
    let metrics: Vec<MetricInfo> = state
        .registry
        .routes()
        .iter()
        .map(|route| MetricInfo {
            metric: route.name().to_string(),
            scope: route.scope.label().to_string(),
            unit: route.unit.to_string(),
            aggregation: route.reduction.label().to_string(),
        })
        .collect();

    Json(MetricListResponse {
        total: metrics.len(),
        metrics,
    })
}

/// GET /metrics/:metric
///
/// Compute an organization-scoped metric.
pub async fn org_metric(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<MetricResponse>> {
    let route = lookup(&state, &metric)?;
    if route.scope.takes_id() {
        return Err(ApiError::NotFound(format!(
            "Metric '{}' requires a {} id",
            route.name(),
            route.scope.label()
        )));
    }

    let result = route
        .invoke(state.store.clone(), Scope::Org, query.into_params())
        .await?;

    Ok(Json(MetricResponse::new(route, result)))
}

/// GET /metrics/:metric/:id
///
/// Compute a repository, product or project metric for one entity.
pub async fn scoped_metric(
    State(state): State<Arc<AppState>>,
    Path((metric, id)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<MetricResponse>> {
    let route = lookup(&state, &metric)?;

    let scope = match route.scope {
        ScopeKind::Repo => Scope::Repo(id),
        ScopeKind::Product => Scope::Product(id),
        ScopeKind::Project => Scope::Project(id),
        ScopeKind::Org => {
            return Err(ApiError::NotFound(format!(
                "Metric '{}' is organization-scoped and takes no id",
                route.name()
            )))
        }
    };

    let result = route
        .invoke(state.store.clone(), scope, query.into_params())
        .await?;

    Ok(Json(MetricResponse::new(route, result)))
}

fn lookup<'a>(state: &'a AppState, metric: &str) -> ApiResult<&'a MetricRoute> {
    state
        .registry
        .find(metric)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown metric '{}'", metric)))
}
