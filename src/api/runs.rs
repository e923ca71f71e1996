//! Run submission and query endpoints
//!
//! Runs are either awaited within the request or detached onto their own
//! task and polled through `/graph/state/{run_id}`.

use crate::{
    api::{status_for, AppState},
    runtime::{
        executor::RunOptions,
        run::{RunRecord, RunStatus},
    },
    workflow::types::StateBag,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

/// Request body for starting a run
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: StateBag,
    /// Absent and `null` both mean "use the engine defaults"
    #[serde(default)]
    pub options: Option<RunOverrides>,
}

/// Per-run overrides of the engine defaults
#[derive(Debug, Default, Deserialize)]
pub struct RunOverrides {
    pub max_steps: Option<usize>,
    pub stop_on_exception: Option<bool>,
}

impl RunOverrides {
    fn apply(&self, defaults: RunOptions) -> RunOptions {
        RunOptions {
            max_steps: self.max_steps.unwrap_or(defaults.max_steps),
            stop_on_exception: self.stop_on_exception.unwrap_or(defaults.stop_on_exception),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    #[serde(default)]
    pub background: bool,
}

/// Response for run submission
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub run_id: String,
    pub status: RunStatus,
    /// `null` for detached runs
    pub final_state: Option<StateBag>,
    pub log: Vec<String>,
    pub error: Option<String>,
}

impl From<RunRecord> for RunResponse {
    fn from(record: RunRecord) -> Self {
        Self {
            run_id: record.run_id,
            status: record.status,
            final_state: Some(record.state),
            log: record.log,
            error: record.error,
        }
    }
}

/// Snapshot of a run for polling clients
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub run_id: String,
    pub graph_id: String,
    pub state: StateBag,
    pub status: RunStatus,
    pub log: Vec<String>,
    pub error: Option<String>,
}

impl From<RunRecord> for StateResponse {
    fn from(record: RunRecord) -> Self {
        Self {
            run_id: record.run_id,
            graph_id: record.graph_id,
            state: record.state,
            status: record.status,
            log: record.log,
            error: record.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: String,
    pub cancelled: bool,
    pub status: RunStatus,
}

/// Create run routes
pub fn create_run_routes() -> Router<AppState> {
    Router::new()
        .route("/graph/run", post(run_graph))
        .route("/graph/state/{run_id}", get(get_run_state))
        .route("/graph/cancel/{run_id}", post(cancel_run))
}

/// Start a run
///
/// POST /graph/run?background=bool
/// Body: { "graph_id": "...", "initial_state": {...}, "options": {...} }
async fn run_graph(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<RunResponse>, StatusCode> {
    let engine = &state.engine;
    let options = payload.options.unwrap_or_default().apply(engine.defaults());

    let record = engine
        .create_run(&payload.graph_id, payload.initial_state)
        .map_err(|e| {
            tracing::warn!("⚠️ Run requested for graph {}: {}", payload.graph_id, e);
            status_for(&e)
        })?;

    if query.background {
        engine.spawn_run(&record.run_id, options);
        return Ok(Json(RunResponse {
            run_id: record.run_id,
            status: record.status,
            final_state: None,
            log: Vec::new(),
            error: None,
        }));
    }

    tracing::info!("▶️ Running graph {} as run {}", payload.graph_id, record.run_id);
    match engine.execute(&record.run_id, options).await {
        Ok(outcome) => Ok(Json(RunResponse {
            run_id: outcome.run_id,
            status: outcome.status,
            final_state: Some(outcome.state),
            log: outcome.log,
            error: outcome.error,
        })),
        Err(e) => {
            // The failure is already recorded; report it with the stored snapshot
            tracing::error!("❌ Run {} failed: {}", record.run_id, e);
            engine
                .run_state(&record.run_id)
                .map(|failed| Json(RunResponse::from(failed)))
                .map_err(|e| status_for(&e))
        }
    }
}

/// Poll a run
///
/// GET /graph/state/{run_id}
async fn get_run_state(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<StateResponse>, StatusCode> {
    state
        .engine
        .run_state(&run_id)
        .map(|record| Json(StateResponse::from(record)))
        .map_err(|e| status_for(&e))
}

/// Cancel a detached run
///
/// POST /graph/cancel/{run_id}
async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<CancelResponse>, StatusCode> {
    let engine = &state.engine;
    let cancelled = engine.cancel(&run_id).map_err(|e| status_for(&e))?;
    let record = engine.run_state(&run_id).map_err(|e| status_for(&e))?;

    Ok(Json(CancelResponse {
        run_id,
        cancelled,
        status: record.status,
    }))
}
