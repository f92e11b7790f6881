//! 分区与位置 handlers
//!
//! - GET /api/zones - 分区列表
//! - GET /api/zones/:zone/entities - 分区内实体
//! - GET /api/zones/:zone/vehicles/available - 分区内可用车辆
//! - GET /api/nearby?lat&lon&radius - 半径内实体（距离升序，半径单位为米）

use crate::AppState;
use crate::middleware::require_request_context;
use crate::utils::response::{
    bad_request_error, entity_ref_to_dto, fleet_error, nearby_hit_to_dto, ok, vehicle_to_dto,
    zone_to_dto,
};
use api_contract::{EntityRefDto, NearbyHitDto, NearbyQuery, VehicleDto, ZoneDto};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};

#[derive(serde::Deserialize)]
pub struct ZonePath {
    zone: String,
}

pub async fn list_zones(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.registry.list_zones(&ctx).await {
        Ok(zones) => {
            let data: Vec<ZoneDto> = zones.into_iter().map(zone_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn zone_entities(
    State(state): State<AppState>,
    Path(path): Path<ZonePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.by_zone(&ctx, &path.zone).await {
        Ok(items) => {
            let data: Vec<EntityRefDto> = items.into_iter().map(entity_ref_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn available_in_zone(
    State(state): State<AppState>,
    Path(path): Path<ZonePath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.query.vehicles_available_in_zone(&ctx, &path.zone).await {
        Ok(items) => {
            let data: Vec<VehicleDto> = items.into_iter().map(vehicle_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
    headers: HeaderMap,
) -> Response {
    if !query.radius.is_finite() || query.radius < 0.0 {
        return bad_request_error("radius must be a non-negative number of meters");
    }
    let ctx = require_request_context(&state, &headers);
    match state
        .query
        .nearby(&ctx, query.lat, query.lon, query.radius)
        .await
    {
        Ok(hits) => {
            let data: Vec<NearbyHitDto> = hits.into_iter().map(nearby_hit_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}
