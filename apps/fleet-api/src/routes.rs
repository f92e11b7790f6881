//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers：
//! - 健康检查：/health
//! - 读数接入：/api/readings
//! - 告警与规则：/api/alerts/*, /api/alert-rules/*
//! - 分区与位置：/api/zones/*, /api/nearby
//! - 车辆与用车：/api/vehicles/*, /api/usage/*
//! - 设备：/api/devices/*
//! - 概览与指标：/api/fleet/summary, /api/metrics

use crate::AppState;
use crate::handlers::*;
use axum::{
    Router,
    routing::{get, post, put},
};

/// 创建完整路由（`/health` + `/api` 前缀下的业务接口）
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router())
}

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/fleet/summary", get(fleet_summary))
        .route("/readings", post(ingest_reading))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:alert_id", get(get_alert))
        .route("/alerts/:alert_id/resolve", post(resolve_alert))
        .route("/alert-rules", get(list_rules).post(create_rule))
        .route("/alert-rules/:rule_id", put(update_rule).delete(delete_rule))
        .route("/zones", get(list_zones))
        .route("/zones/:zone/entities", get(zone_entities))
        .route("/zones/:zone/vehicles/available", get(available_in_zone))
        .route("/nearby", get(nearby))
        .route("/vehicles", get(list_vehicles))
        .route(
            "/vehicles/:plate",
            get(get_vehicle).put(upsert_vehicle).delete(retire_vehicle),
        )
        .route("/vehicles/:plate/location", put(update_vehicle_location))
        .route("/vehicles/:plate/status", put(update_vehicle_status))
        .route("/vehicles/:plate/checkout", post(checkout_vehicle))
        .route("/vehicles/:plate/usage", get(vehicle_usage_history))
        .route("/usage/:usage_id/checkin", post(checkin_usage))
        .route("/devices", get(list_devices))
        .route("/devices/offline", get(list_offline_devices))
        .route(
            "/devices/:device_id",
            get(get_device).put(upsert_device).delete(retire_device),
        )
        .route("/devices/:device_id/status", get(get_device_status))
        .route("/devices/:device_id/readings", get(list_device_readings))
}
