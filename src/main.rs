//! Cimetry API Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from `./cimetry.toml` or `/etc/cimetry/config.toml`, with
//! environment overrides:
//! - `CIMETRY_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `CIMETRY_API_PORT`: Port to listen on (default: 8082)
//! - `CIMETRY_LOG_LEVEL`: Log level (default: info)
//! - `CIMETRY_LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `RUST_LOG`: Full tracing filter, takes precedence over the level
//!
//! The server runs against the in-memory store; point a real deployment
//! at its backend by implementing `CiStore` and swapping it in here.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cimetry::api::{serve, ApiConfig, AppState};
use cimetry::config::Config;
use cimetry::store::{Execution, MemoryStore};

/// CI metrics catalog server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Override the port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Seed the in-memory store with demo data
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    init_tracing(&config);

    tracing::info!("Starting Cimetry API server v{}", env!("CARGO_PKG_VERSION"));

    let mut store = MemoryStore::new();
    if args.demo {
        seed_demo(&mut store);
        tracing::info!("Seeded demo data");
    }

    let api_config = ApiConfig::new(config.api.host.clone(), config.api.port);
    let state = AppState::new(Arc::new(store), api_config.clone());

    tracing::info!("Starting server on {}", api_config.addr());
    serve(state, &api_config).await?;

    tracing::info!("Cimetry API server stopped");
    Ok(())
}

/// Initialize the tracing subscriber from the logging config
fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "cimetry={},tower_http=debug",
            config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Populate the store with a small plausible CI history
fn seed_demo(store: &mut MemoryStore) {
    let now = chrono::Utc::now().timestamp();
    let hour = 3600;

    store.add_build("backend", "backend-ci");
    store.add_build("backend", "backend-nightly");
    store.add_build("frontend", "frontend-ci");
    store.add_build("tooling", "tooling-ci");

    store.link_product("platform", &["core", "apps"]);
    store.link_project("core", &["backend", "tooling"]);
    store.link_project("apps", &["frontend"]);

    // backend: stable except a broken stretch yesterday
    for i in 0..24 {
        let ts = now - i * hour;
        let execution = if (6..9).contains(&i) {
            Execution::failed(ts).duration(240.0)
        } else {
            Execution::passed(ts).duration(300.0)
        };
        store.record_execution("backend-ci", execution);
        store.record_count("total-jobs", ts, 1.0);
        store.record_count("total-repo-jobs:backend", ts, 1.0);
        store.record_count("total-product-jobs:platform", ts, 1.0);
        store.record_count("total-project-jobs:core", ts, 1.0);
        if (6..9).contains(&i) {
            store.record_count("total-failed-jobs", ts, 1.0);
            store.record_count("total-failed-repo-jobs:backend", ts, 1.0);
        } else {
            store.record_count("total-passed-jobs", ts, 1.0);
            store.record_count("total-passed-repo-jobs:backend", ts, 1.0);
        }
    }

    store.record_execution("backend-nightly", Execution::passed(now - 12 * hour).duration(1800.0));
    store.record_execution("frontend-ci", Execution::passed(now - 2 * hour).duration(120.0));
    store.record_execution("frontend-ci", Execution::passed(now - hour).duration(130.0));
}
