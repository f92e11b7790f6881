//! 设备 handlers
//!
//! - GET /api/devices - 设备列表（`includeRetired=true` 包含已退役设备）
//! - GET /api/devices/offline - 离线设备
//! - GET /api/devices/:device_id - 设备详情
//! - PUT /api/devices/:device_id - 写入设备（设备类型不可修改）
//! - DELETE /api/devices/:device_id - 退役（软删除，移出位置索引）
//! - GET /api/devices/:device_id/status - 设备状态视图（最新读数、活动告警数）

use crate::AppState;
use crate::handlers::vehicles::ListQuery;
use crate::middleware::require_request_context;
use crate::utils::response::{device_status_to_dto, device_to_dto, fleet_error, ok};
use crate::utils::{device_location, normalize_required, parse_field};
use api_contract::{DeviceDto, UpsertDeviceRequest};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use domain::{Device, DeviceStatus, DeviceType};
use fleet_storage::UpsertOutcome;

#[derive(serde::Deserialize)]
pub struct DeviceIdPath {
    device_id: String,
}

pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.list_devices(&ctx, query.include_retired).await {
        Ok(items) => {
            let data: Vec<DeviceDto> = items.into_iter().map(device_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn list_offline_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.offline_devices(&ctx).await {
        Ok(items) => {
            let data: Vec<DeviceDto> = items.into_iter().map(device_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn get_device(
    State(state): State<AppState>,
    Path(path): Path<DeviceIdPath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.get_device(&ctx, &path.device_id).await {
        Ok(device) => ok(StatusCode::OK, device_to_dto(device)),
        Err(err) => fleet_error(err),
    }
}

/// 写入设备
///
/// 状态缺省为 `online`；已有设备的创建时间与最后通讯时间由注册表保留。
pub async fn upsert_device(
    State(state): State<AppState>,
    Path(path): Path<DeviceIdPath>,
    headers: HeaderMap,
    Json(req): Json<UpsertDeviceRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let device_id = match normalize_required(path.device_id, "deviceId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let name = match normalize_required(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let device_type = match parse_field::<DeviceType>(&req.device_type) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let status = match req.status.as_deref() {
        Some(value) => match parse_field::<DeviceStatus>(value) {
            Ok(status) => status,
            Err(response) => return response,
        },
        None => DeviceStatus::Online,
    };
    let location = match device_location(req.location) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let device = Device {
        device_id: device_id.clone(),
        name,
        device_type,
        status,
        location,
        config: req.config.into_iter().collect(),
        last_communication_ms: None,
        retired: false,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    let outcome = match state.registry.upsert_device(&ctx, device).await {
        Ok(outcome) => outcome,
        Err(err) => return fleet_error(err),
    };
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Replaced | UpsertOutcome::Unchanged => StatusCode::OK,
    };
    match state.registry.get_device(&ctx, &device_id).await {
        Ok(device) => ok(status, device_to_dto(device)),
        Err(err) => fleet_error(err),
    }
}

pub async fn retire_device(
    State(state): State<AppState>,
    Path(path): Path<DeviceIdPath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.retire_device(&ctx, &path.device_id).await {
        Ok(device) => ok(StatusCode::OK, device_to_dto(device)),
        Err(err) => fleet_error(err),
    }
}

pub async fn get_device_status(
    State(state): State<AppState>,
    Path(path): Path<DeviceIdPath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.device_status(&ctx, &path.device_id).await {
        Ok(view) => ok(StatusCode::OK, device_status_to_dto(view)),
        Err(err) => fleet_error(err),
    }
}
