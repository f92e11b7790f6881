//! 车辆与用车 handlers
//!
//! - GET /api/vehicles - 车辆列表（`includeRetired=true` 包含已退役车辆）
//! - GET /api/vehicles/:plate - 车辆详情
//! - PUT /api/vehicles/:plate - 写入车辆（新建 201，替换 / 未变 200）
//! - DELETE /api/vehicles/:plate - 退役（软删除，移出位置索引）
//! - PUT /api/vehicles/:plate/location - 移动车辆
//! - PUT /api/vehicles/:plate/status - 状态 / 电量更新（使用中只能经借出与归还变更）
//! - POST /api/vehicles/:plate/checkout - 借出
//! - GET /api/vehicles/:plate/usage - 用车记录
//! - POST /api/usage/:usage_id/checkin - 归还

use crate::AppState;
use crate::middleware::require_request_context;
use crate::utils::response::{fleet_error, ok, usage_to_dto, vehicle_to_dto};
use crate::utils::{normalize_optional, normalize_required, parse_field, vehicle_location};
use api_contract::{
    CheckinRequestDto, CheckoutRequestDto, LocationRequest, UpdateVehicleStatusRequest,
    UpsertVehicleRequest, UsageDto, VehicleDto,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use domain::{UsageMetrics, Vehicle, VehicleDocuments, VehicleStatus};
use fleet_registry::{CheckinRequest, CheckoutRequest, VehicleStatusUpdate};
use fleet_storage::UpsertOutcome;

#[derive(serde::Deserialize)]
pub struct VehiclePath {
    plate: String,
}

#[derive(serde::Deserialize)]
pub struct UsagePath {
    usage_id: String,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_retired: bool,
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.list_vehicles(&ctx, query.include_retired).await {
        Ok(items) => {
            let data: Vec<VehicleDto> = items.into_iter().map(vehicle_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.vehicle(&ctx, &path.plate).await {
        Ok(vehicle) => ok(StatusCode::OK, vehicle_to_dto(vehicle)),
        Err(err) => fleet_error(err),
    }
}

/// 写入车辆
///
/// 车牌取自路径并统一为大写；分区必须已定义，底盘号与发动机号一经设置不可修改。
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: 字段缺失、坐标越界、状态非法
/// - `404 NOT FOUND`: 分区或当前用户不存在
/// - `409 CONFLICT`: 不可变字段被修改
pub async fn upsert_vehicle(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
    Json(req): Json<UpsertVehicleRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let plate = match normalize_required(path.plate, "plate") {
        Ok(value) => Vehicle::normalize_plate(&value),
        Err(response) => return response,
    };
    let model = match normalize_required(req.model, "model") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let owner_id = match normalize_optional(req.owner_id, "ownerId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let current_user = match normalize_optional(req.current_user, "currentUser") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let status = match req.status.as_deref() {
        Some(value) => match parse_field::<VehicleStatus>(value) {
            Ok(status) => status,
            Err(response) => return response,
        },
        None => VehicleStatus::Available,
    };
    let location = match vehicle_location(req.location) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let vehicle = Vehicle {
        plate: plate.clone(),
        model,
        owner_id,
        documents: VehicleDocuments {
            chassis: req.chassis,
            engine: req.engine,
            registration: req.registration,
            reference_price: req.reference_price,
        },
        location,
        status,
        battery_level: req.battery_level,
        current_user,
        retired: false,
        updated_at_ms: 0,
    };
    let outcome = match state.registry.upsert_vehicle(&ctx, vehicle).await {
        Ok(outcome) => outcome,
        Err(err) => return fleet_error(err),
    };
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Replaced | UpsertOutcome::Unchanged => StatusCode::OK,
    };
    match state.registry.get_vehicle(&ctx, &plate).await {
        Ok(vehicle) => ok(status, vehicle_to_dto(vehicle)),
        Err(err) => fleet_error(err),
    }
}

pub async fn retire_vehicle(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.retire_vehicle(&ctx, &path.plate).await {
        Ok(vehicle) => ok(StatusCode::OK, vehicle_to_dto(vehicle)),
        Err(err) => fleet_error(err),
    }
}

pub async fn update_vehicle_location(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
    Json(req): Json<LocationRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let location = match vehicle_location(req) {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state
        .registry
        .update_vehicle_location(&ctx, &path.plate, location)
        .await
    {
        Ok(vehicle) => ok(StatusCode::OK, vehicle_to_dto(vehicle)),
        Err(err) => fleet_error(err),
    }
}

pub async fn update_vehicle_status(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
    Json(req): Json<UpdateVehicleStatusRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let status = match req.status.as_deref() {
        Some(value) => match parse_field::<VehicleStatus>(value) {
            Ok(status) => Some(status),
            Err(response) => return response,
        },
        None => None,
    };
    let update = VehicleStatusUpdate {
        status,
        battery_level: req.battery_level,
    };
    match state
        .registry
        .update_vehicle_status(&ctx, &path.plate, update)
        .await
    {
        Ok(vehicle) => ok(StatusCode::OK, vehicle_to_dto(vehicle)),
        Err(err) => fleet_error(err),
    }
}

/// 借出车辆：车辆必须可用，用户必须存在且启用。
pub async fn checkout_vehicle(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequestDto>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let user_id = match normalize_required(req.user_id, "userId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let request = CheckoutRequest {
        plate: path.plate,
        user_id,
        origin: req.origin,
        notes: req.notes,
    };
    match state.registry.checkout(&ctx, request).await {
        Ok(record) => ok(StatusCode::CREATED, usage_to_dto(record)),
        Err(err) => fleet_error(err),
    }
}

/// 归还车辆：结束时间缺省为当前时间，不得早于开始时间。
pub async fn checkin_usage(
    State(state): State<AppState>,
    Path(path): Path<UsagePath>,
    headers: HeaderMap,
    Json(req): Json<CheckinRequestDto>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let location = match req.location {
        Some(location) => match vehicle_location(location) {
            Ok(value) => Some(value),
            Err(response) => return response,
        },
        None => None,
    };
    let metrics = if req.average_speed_kmh.is_some()
        || req.battery_consumed.is_some()
        || req.stops.is_some()
    {
        Some(UsageMetrics {
            average_speed_kmh: req.average_speed_kmh,
            battery_consumed: req.battery_consumed,
            stops: req.stops,
        })
    } else {
        None
    };
    let request = CheckinRequest {
        ended_at_ms: req.ended_at_ms,
        destination: req.destination,
        distance_km: req.distance_km,
        location,
        battery_level: req.battery_level,
        metrics,
        notes: req.notes,
    };
    match state.registry.checkin(&ctx, &path.usage_id, request).await {
        Ok(record) => ok(StatusCode::OK, usage_to_dto(record)),
        Err(err) => fleet_error(err),
    }
}

pub async fn vehicle_usage_history(
    State(state): State<AppState>,
    Path(path): Path<VehiclePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.usage_history(&ctx, &path.plate).await {
        Ok(items) => {
            let data: Vec<UsageDto> = items.into_iter().map(usage_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}
