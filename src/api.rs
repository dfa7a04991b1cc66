// src/api.rs
// HTTP surface: the read-only status/monitoring boundary plus a thin
// transport shim that forwards tool calls into the Toolbox. Session
// plumbing for richer transports lives outside this crate.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::health::HealthMonitor;
use crate::payment::PROOF_HEADER;
use crate::snapshot::SnapshotStore;
use crate::status::{build_status, StatusReport};
use crate::tools::{ToolCallResult, Toolbox};

#[derive(Clone)]
pub struct AppState {
    pub toolbox: Arc<Toolbox>,
    pub health: Arc<HealthMonitor>,
    pub store: Arc<SnapshotStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(service_health))
        .route("/status.json", get(status))
        .route("/status/history", get(status_history))
        .route("/tools/{name}", post(call_tool))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ServiceHealth {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn service_health() -> Json<ServiceHealth> {
    Json(ServiceHealth {
        status: "ok",
        service: "jobmesh-aggregator",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(build_status(&state.health, &state.store, Utc::now()))
}

#[derive(Deserialize)]
struct HistoryParams {
    days: Option<i64>,
}

#[derive(Serialize)]
struct HistoryPoint {
    timestamp: chrono::DateTime<Utc>,
    uptime: f64,
    latency_p95: u64,
    success_rate: f64,
}

#[derive(Serialize)]
struct HistoryResponse {
    period: String,
    data_points: usize,
    metrics: Vec<HistoryPoint>,
}

async fn status_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let days = params.days.unwrap_or(7).clamp(1, 90);
    let snapshots = state
        .store
        .historical(days, Utc::now())
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "failed to read metric history");
            Vec::new()
        });

    Json(HistoryResponse {
        period: format!("{}d", days),
        data_points: snapshots.len(),
        metrics: snapshots
            .into_iter()
            .map(|m| HistoryPoint {
                timestamp: m.timestamp,
                uptime: m.uptime_7d,
                latency_p95: m.latency_p95,
                success_rate: m.success_rate * 100.0,
            })
            .collect(),
    })
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Json<ToolCallResult> {
    let args = body.map(|Json(v)| v).unwrap_or(Value::Object(Default::default()));
    let proof = headers.get(PROOF_HEADER).and_then(|v| v.to_str().ok());
    Json(state.toolbox.call(&name, args, proof).await)
}
