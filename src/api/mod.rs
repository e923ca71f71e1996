//! HTTP API Layer
//!
//! This module provides the REST API endpoints for the graph engine. It handles:
//! - Graph creation, retrieval and deletion
//! - Synchronous and detached run submission
//! - Run polling and cancellation

// Graph management endpoints (POST/GET/DELETE)
pub mod graphs;

// Run submission, polling and cancellation endpoints
pub mod runs;

use crate::{error::EngineError, runtime::engine::ExecutionEngine};
use axum::http::StatusCode;
use std::sync::Arc;

// Re-export router builders
pub use graphs::create_graph_routes;
pub use runs::create_run_routes;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Engine owning the graph and run repositories
    pub engine: Arc<ExecutionEngine>,
    /// Threshold used by the sample graph when the request does not give one
    pub default_threshold: i64,
}

/// Map engine errors to HTTP status codes
pub(crate) fn status_for(err: &EngineError) -> StatusCode {
    match err {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        EngineError::NotPending(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{Config, EngineConfig, ServerConfig},
        server::create_app,
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app() -> Router {
        create_app(Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            engine: EngineConfig {
                max_steps: 1000,
                stop_on_exception: true,
                default_threshold: 70,
            },
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    const CODE: &str = "def f(x):\n    return x\n";

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_create_get_delete_graph() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/graph/create",
            Some(json!({
                "nodes": [{"name": "a"}, {"name": "b", "func": "compute_quality"}],
                "edges": {"a": "b", "b": null},
                "start_node": "a"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let graph_id = body["graph_id"].as_str().unwrap().to_string();

        let (status, graph) = send(&app, Method::GET, &format!("/graph/{graph_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(graph["start_node"], json!("a"));
        assert_eq!(graph["edges"], json!({"a": "b"}));

        let (status, _) = send(&app, Method::DELETE, &format!("/graph/{graph_id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, &format!("/graph/{graph_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &format!("/graph/{graph_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sample_graph_sync_run() {
        let app = app();
        let (_, body) = send(
            &app,
            Method::POST,
            "/graph/create_sample_code_review?threshold=10",
            None,
        )
        .await;
        let graph_id = body["graph_id"].as_str().unwrap().to_string();

        let (status, run) = send(
            &app,
            Method::POST,
            "/graph/run",
            Some(json!({"graph_id": graph_id, "initial_state": {"code": CODE}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], json!("completed"));
        assert_eq!(run["error"], Value::Null);
        assert!(run["final_state"]["quality_score"].as_i64().unwrap() >= 10);

        let run_id = run["run_id"].as_str().unwrap();
        let (status, snapshot) = send(&app, Method::GET, &format!("/graph/state/{run_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["graph_id"], json!(graph_id));
        assert_eq!(snapshot["log"], run["log"]);
    }

    #[tokio::test]
    async fn test_sample_graph_uses_default_threshold() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/graph/create_sample_code_review", None).await;
        let graph_id = body["graph_id"].as_str().unwrap();

        let (_, graph) = send(&app, Method::GET, &format!("/graph/{graph_id}"), None).await;
        let quality = graph["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|node| node["name"] == "quality")
            .cloned()
            .unwrap();
        assert_eq!(quality["params"]["threshold"], json!(70));
    }

    #[tokio::test]
    async fn test_failed_sync_run_answers_ok() {
        let app = app();
        let (_, body) = send(
            &app,
            Method::POST,
            "/graph/create",
            Some(json!({
                "nodes": [{"name": "a"}],
                "edges": {"a": {"bogus": true}},
                "start_node": "a"
            })),
        )
        .await;
        let graph_id = body["graph_id"].as_str().unwrap();

        let (status, run) = send(
            &app,
            Method::POST,
            "/graph/run",
            Some(json!({"graph_id": graph_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], json!("failed"));
        assert!(run["error"].as_str().unwrap().contains("invalid edge spec"));
    }

    #[tokio::test]
    async fn test_null_options_use_defaults() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/graph/create_sample_code_review?threshold=10", None).await;
        let graph_id = body["graph_id"].as_str().unwrap();

        let (status, run) = send(
            &app,
            Method::POST,
            "/graph/run",
            Some(json!({"graph_id": graph_id, "initial_state": {"code": CODE}, "options": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], json!("completed"));
    }

    #[tokio::test]
    async fn test_background_run_and_poll() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/graph/create_sample_code_review", None).await;
        let graph_id = body["graph_id"].as_str().unwrap();

        let (status, run) = send(
            &app,
            Method::POST,
            "/graph/run?background=true",
            Some(json!({
                "graph_id": graph_id,
                "initial_state": {"code": CODE},
                "options": {"max_steps": 3}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["status"], json!("pending"));
        assert_eq!(run["final_state"], Value::Null);
        assert_eq!(run["log"], json!([]));

        let run_id = run["run_id"].as_str().unwrap();
        let mut last = Value::Null;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let (_, snapshot) = send(&app, Method::GET, &format!("/graph/state/{run_id}"), None).await;
            last = snapshot;
            if last["status"] == "completed" {
                break;
            }
        }
        assert_eq!(last["status"], json!("completed"));
        assert!(last["log"]
            .as_array()
            .unwrap()
            .iter()
            .any(|line| line == "Max steps 3 reached; aborting."));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let app = app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/graph/run",
            Some(json!({"graph_id": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/graph/state/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::POST, "/graph/cancel/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_finished_run() {
        let app = app();
        let (_, body) = send(&app, Method::POST, "/graph/create_sample_code_review?threshold=10", None).await;
        let graph_id = body["graph_id"].as_str().unwrap();
        let (_, run) = send(
            &app,
            Method::POST,
            "/graph/run",
            Some(json!({"graph_id": graph_id, "initial_state": {"code": CODE}})),
        )
        .await;
        let run_id = run["run_id"].as_str().unwrap();

        let (status, body) = send(&app, Method::POST, &format!("/graph/cancel/{run_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cancelled"], json!(false));
        assert_eq!(body["status"], json!("completed"));
    }
}
