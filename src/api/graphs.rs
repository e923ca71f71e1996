//! Graph management REST API endpoints
//!
//! Graphs are created from JSON definitions (or the bundled code-review
//! sample), fetched back in normalized form and deleted explicitly.

use crate::{
    api::AppState,
    workflow::{
        samples::build_code_review_graph,
        types::{GraphCreateRequest, GraphDefinition},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

/// Response for graph creation/deletion
#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub graph_id: String,
}

/// Query string of the sample graph endpoint
#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    pub threshold: Option<i64>,
}

/// Create graph management routes
pub fn create_graph_routes() -> Router<AppState> {
    Router::new()
        .route("/graph/create", post(create_graph))
        .route("/graph/create_sample_code_review", post(create_sample_code_review))
        .route("/graph/{graph_id}", get(get_graph).delete(delete_graph))
}

/// Create a graph from a definition
///
/// POST /graph/create
/// Body: { "nodes": [...], "edges": {...}, "start_node": "..." }
async fn create_graph(
    State(state): State<AppState>,
    Json(payload): Json<GraphCreateRequest>,
) -> Json<GraphResponse> {
    let graph_id = state.engine.graphs().create(payload);
    tracing::info!("🔥 Created graph: {}", graph_id);
    Json(GraphResponse { graph_id })
}

/// Build the sample code-review graph
///
/// POST /graph/create_sample_code_review?threshold=N
async fn create_sample_code_review(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Json<GraphResponse> {
    let threshold = query.threshold.unwrap_or(state.default_threshold);
    let graph = state.engine.graphs().insert(build_code_review_graph(threshold));

    tracing::info!(
        "🔥 Created sample code-review graph: {} (threshold {})",
        graph.graph_id,
        threshold
    );
    Json(GraphResponse {
        graph_id: graph.graph_id.clone(),
    })
}

/// Get a stored graph by ID
///
/// GET /graph/{graph_id}
async fn get_graph(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> Result<Json<GraphDefinition>, StatusCode> {
    match state.engine.graphs().get(&graph_id) {
        Some(graph) => Ok(Json(graph.as_ref().clone())),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Delete a graph
///
/// DELETE /graph/{graph_id}
/// Runs already executing keep their own handle on the definition.
async fn delete_graph(
    State(state): State<AppState>,
    Path(graph_id): Path<String>,
) -> Result<Json<GraphResponse>, StatusCode> {
    if !state.engine.graphs().remove(&graph_id) {
        tracing::warn!("⚠️ Delete requested for unknown graph {}", graph_id);
        return Err(StatusCode::NOT_FOUND);
    }

    tracing::info!("🗑️ Deleted graph: {}", graph_id);
    Ok(Json(GraphResponse { graph_id }))
}
