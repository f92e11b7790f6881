//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 读数上报请求体（兼容葡萄牙语字段名）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReadingRequest {
    #[serde(alias = "device_id", alias = "dispositivoId")]
    pub device_id: String,
    #[serde(alias = "reading_type", alias = "tipo")]
    pub reading_type: String,
    #[serde(alias = "valor")]
    pub value: f64,
    #[serde(default, alias = "unidade")]
    pub unit: String,
    #[serde(alias = "ts", alias = "tsMs")]
    pub timestamp: i64,
    #[serde(default)]
    pub raw_payload: Option<Value>,
    #[serde(default, alias = "event_type")]
    pub event_type: Option<String>,
}

/// 读数上报结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceiptDto {
    pub reading_id: String,
    pub event_id: Option<String>,
    pub alert_ids: Vec<String>,
    pub duplicate: bool,
}

/// 读数返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub reading_id: String,
    pub device_id: String,
    pub device_type: String,
    pub reading_type: String,
    pub value: f64,
    pub unit: String,
    pub ts_ms: i64,
    pub received_at_ms: i64,
    pub raw_payload: Value,
    pub alert_ids: Vec<String>,
}

/// 告警解决请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertRequest {
    #[serde(alias = "resolver_id")]
    pub resolver_id: String,
    #[serde(default, alias = "observacoes")]
    pub notes: Option<String>,
}

/// 告警列表过滤参数。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListQuery {
    pub zone: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "min_severity")]
    pub min_severity: Option<String>,
    #[serde(alias = "device_id")]
    pub device_id: Option<String>,
}

/// 告警返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDto {
    pub alert_id: String,
    pub category: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub device_id: Option<String>,
    pub vehicle_plate: Option<String>,
    pub zone: Option<String>,
    pub active: bool,
    pub created_at_ms: i64,
    pub source_ts_ms: i64,
    pub resolved_at_ms: Option<i64>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub reading_id: Option<String>,
    pub event_id: Option<String>,
    pub rule_id: Option<String>,
    pub confidence: Option<f64>,
    pub open_minutes: i64,
}

/// 告警规则创建请求体。`cooldownSeconds` 必填，没有默认值。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub name: String,
    pub category: String,
    pub severity: String,
    pub condition: Value,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "cooldown_seconds")]
    pub cooldown_seconds: Option<u64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// 告警规则返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub rule_id: String,
    pub name: String,
    pub category: String,
    pub severity: String,
    pub enabled: bool,
    pub condition: Value,
    pub title: String,
    pub description: String,
    pub cooldown_seconds: u64,
    pub created_at_ms: i64,
}

/// 规则启停请求体。
#[derive(Debug, Deserialize)]
pub struct RuleToggleRequest {
    pub enabled: bool,
}

/// 位置请求体（车辆 / 设备共用）。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[serde(alias = "zona")]
    pub zone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, alias = "vaga")]
    pub slot: Option<String>,
    #[serde(default, alias = "setor")]
    pub sector: Option<String>,
    #[serde(default, alias = "andar")]
    pub floor: Option<i32>,
    #[serde(default, alias = "descricao")]
    pub description: Option<String>,
}

/// 车辆写入请求体（车牌取自路径）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertVehicleRequest {
    pub model: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub chassis: Option<String>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub reference_price: Option<f64>,
    pub location: LocationRequest,
    #[serde(default)]
    pub status: Option<String>,
    pub battery_level: u8,
    #[serde(default)]
    pub current_user: Option<String>,
}

/// 车辆状态 / 电量更新请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleStatusRequest {
    pub status: Option<String>,
    pub battery_level: Option<u8>,
}

/// 车辆返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub plate: String,
    pub model: String,
    pub owner_id: Option<String>,
    pub chassis: Option<String>,
    pub engine: Option<String>,
    pub registration: Option<String>,
    pub reference_price: Option<f64>,
    pub zone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub slot: Option<String>,
    pub sector: Option<String>,
    pub floor: Option<i32>,
    pub status: String,
    pub battery_level: u8,
    pub battery_low: bool,
    pub current_user: Option<String>,
    pub retired: bool,
    pub updated_at_ms: i64,
}

/// 借出请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequestDto {
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 归还请求体。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequestDto {
    #[serde(default)]
    pub ended_at_ms: Option<i64>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub location: Option<LocationRequest>,
    #[serde(default)]
    pub battery_level: Option<u8>,
    #[serde(default)]
    pub average_speed_kmh: Option<f64>,
    #[serde(default)]
    pub battery_consumed: Option<u8>,
    #[serde(default)]
    pub stops: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// 用车记录返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDto {
    pub usage_id: String,
    pub plate: String,
    pub model: String,
    pub user_id: String,
    pub user_name: String,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
    pub status: String,
    pub notes: Option<String>,
}

/// 设备写入请求体（设备 ID 取自路径）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDeviceRequest {
    pub name: String,
    pub device_type: String,
    #[serde(default)]
    pub status: Option<String>,
    pub location: LocationRequest,
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// 设备返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub device_id: String,
    pub name: String,
    pub device_type: String,
    pub status: String,
    pub zone: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub config: Map<String, Value>,
    pub last_communication_ms: Option<i64>,
    pub retired: bool,
}

/// 设备状态视图。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatusDto {
    pub device: DeviceDto,
    pub latest_reading: Option<ReadingDto>,
    pub active_alerts: usize,
    pub silent_minutes: Option<i64>,
}

/// 分区返回结构。
#[derive(Debug, Serialize)]
pub struct ZoneDto {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// 分区 / 邻近查询中的实体引用。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRefDto {
    pub kind: String,
    pub id: String,
}

/// 邻近查询参数。
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
}

/// 邻近查询结果项。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyHitDto {
    pub kind: String,
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_m: f64,
}

/// 车队概览。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummaryDto {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub maintenance: usize,
    pub reserved: usize,
    pub low_battery: usize,
    pub critical_battery: usize,
    pub average_battery: f64,
    pub devices_online: usize,
    pub devices_offline: usize,
    pub active_alerts: usize,
}

/// Telemetry 指标快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub readings_ingested: u64,
    pub readings_duplicate: u64,
    pub readings_rejected: u64,
    pub events_recorded: u64,
    pub alerts_created: u64,
    pub alerts_suppressed: u64,
    pub alerts_resolved: u64,
    pub rule_failures: u64,
    pub lock_contention: u64,
    pub deadline_exceeded: u64,
    pub index_rebuilds: u64,
    pub devices_marked_offline: u64,
    pub ingest_latency_ms_total: u64,
    pub ingest_latency_ms_count: u64,
}
