//! graphflow: conditional node-graph workflow runtime
//!
//! Main entry point for the graphflow server. Initializes configuration and
//! starts the HTTP server with graph management and run execution endpoints.

use graphflow::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Graph management API at /graph/create, /graph/{graph_id}
/// - Run submission and polling at /graph/run, /graph/state/{run_id}
/// - Health check at /health
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (defaults to 0.0.0.0:8000, overridable through GRAPHFLOW_* variables)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
