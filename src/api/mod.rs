//! Cimetry REST API
//!
//! HTTP surface over the metric registry, built with Axum. The routing
//! layer stays deliberately thin: it extracts `begin` / `end` / `max`
//! query parameters, dispatches through the registry, and serializes the
//! result - every metric shares the same two endpoint shapes.
//!
//! # Endpoints
//!
//! ## Metrics
//! - `GET /metrics` - List registered metrics
//! - `GET /metrics/:metric` - Organization metric (e.g. `/metrics/total-builds`)
//! - `GET /metrics/:metric/:id` - Scoped metric (e.g. `/metrics/repo-broken-time/r1`)
//!
//! ## Health
//! - `GET /health` - Service status
//!
//! # Example
//!
//! ```rust,ignore
//! use cimetry::api::{serve, ApiConfig, AppState};
//! use cimetry::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let config = ApiConfig::default();
//!     let state = AppState::new(store, config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/metrics", get(routes::metrics::list_metrics))
        .route("/metrics/:metric", get(routes::metrics::org_metric))
        .route("/metrics/:metric/:id", get(routes::metrics::scoped_metric))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()) // Configure properly in production
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Cimetry API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Cimetry API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
