//! 读数接入与查询 handlers
//!
//! - POST /api/readings - 上报一条读数（幂等：同设备同源时间戳返回首条读数）
//! - GET /api/devices/:device_id/readings - 设备最近读数

use crate::AppState;
use crate::middleware::require_request_context;
use crate::utils::normalize_required;
use crate::utils::response::{fleet_error, ok, reading_to_dto, receipt_to_dto};
use api_contract::{IngestReadingRequest, ReadingDto};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use fleet_ingest::IngestRequest;
use serde_json::Value;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    device_id: String,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ReadingListQuery {
    limit: Option<usize>,
}

/// 上报读数
///
/// 新读数返回 `201 CREATED`；重复上报返回 `200 OK` 与首条读数 ID（`duplicate = true`）。
pub async fn ingest_reading(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IngestReadingRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let device_id = match normalize_required(req.device_id, "deviceId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let reading_type = match normalize_required(req.reading_type, "readingType") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let request = IngestRequest {
        device_id,
        reading_type,
        value: req.value,
        unit: req.unit,
        ts_ms: req.timestamp,
        raw_payload: req.raw_payload.unwrap_or(Value::Null),
        event_type: req.event_type,
    };
    match state.ingestor.ingest(&ctx, request).await {
        Ok(receipt) => {
            let status = if receipt.duplicate {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            ok(status, receipt_to_dto(receipt))
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn list_device_readings(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    Query(query): Query<ReadingListQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state
        .query
        .recent_readings(&ctx, &path.device_id, query.limit)
        .await
    {
        Ok(items) => {
            let data: Vec<ReadingDto> = items.into_iter().map(reading_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}
