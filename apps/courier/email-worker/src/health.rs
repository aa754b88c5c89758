//! Health and ops endpoints for the worker.
//!
//! - `/health` — liveness; always OK while the process runs
//! - `/ready` — readiness; checks the queue store is reachable
//! - `/queue/counts` — aggregate per-state job counts

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use job_queue::QueueClient;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthState {
    pub client: Arc<QueueClient>,
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/queue/counts", get(counts_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match state.client.counts().await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ready"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not ready", "error": e.to_string()})),
        ),
    }
}

async fn counts_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match state.client.counts().await {
        Ok(counts) => (StatusCode::OK, Json(json!(counts))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": e.to_string()})),
        ),
    }
}
