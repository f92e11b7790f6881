//! 健康检查、指标快照与车队概览
//!
//! - GET /health
//! - GET /api/metrics
//! - GET /api/fleet/summary

use crate::AppState;
use crate::middleware::require_request_context;
use crate::utils::response::{fleet_error, metrics_to_dto, ok, summary_to_dto};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use fleet_telemetry::metrics;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_metrics() -> Response {
    ok(StatusCode::OK, metrics_to_dto(metrics().snapshot()))
}

pub async fn fleet_summary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.fleet_summary(&ctx).await {
        Ok(summary) => ok(StatusCode::OK, summary_to_dto(summary)),
        Err(err) => fleet_error(err),
    }
}
