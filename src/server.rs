//! Server setup and initialization
//!
//! Wires together all components: repositories, step functions, execution
//! engine and HTTP routes. Provides the main application factory function for
//! creating the Axum app.

use crate::{
    api::{create_graph_routes, create_run_routes, AppState},
    config::Config,
    runtime::{engine::ExecutionEngine, run::RunRepository},
    tools,
    workflow::registry::GraphRepository,
};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the execution engine with the built-in step functions
pub fn create_engine(config: &Config) -> Arc<ExecutionEngine> {
    tracing::info!("📊 Initializing graph and run repositories");
    let graphs = Arc::new(GraphRepository::new());
    let runs = Arc::new(RunRepository::new());

    let steps = tools::builtin_registry();
    tracing::info!("⚙️ Registered {} step functions: {:?}", steps.len(), steps.names());

    tracing::info!("🚀 Initializing execution engine");
    Arc::new(ExecutionEngine::new(
        graphs,
        runs,
        Arc::new(steps),
        config.engine.run_options(),
    ))
}

/// Create the router over an existing application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Graph management API routes
        .merge(create_graph_routes())
        // Run submission and polling routes
        .merge(create_run_routes())
        .with_state(state)
}

/// Create the main Axum application with all routes
pub fn create_app(config: Config) -> Router {
    let state = AppState {
        engine: create_engine(&config),
        default_threshold: config.engine.default_threshold,
    };

    tracing::info!("📡 Creating HTTP router with all endpoints");
    let app = create_router(state);

    tracing::info!("✅ Application initialized successfully");
    app
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting graphflow server...");
    tracing::debug!("Configuration: {:?}", config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app = create_app(config);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
