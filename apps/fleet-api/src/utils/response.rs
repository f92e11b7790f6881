//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：fleet_error 按错误码选择状态码，bad_request_error 用于请求体校验
//! - DTO 转换：领域模型 → api-contract 中的 camelCase 结构

use api_contract::{
    AlertDto, ApiResponse, DeviceDto, DeviceStatusDto, EntityRefDto, FleetSummaryDto,
    IngestReceiptDto, MetricsSnapshotDto, NearbyHitDto, ReadingDto, RuleDto, UsageDto, VehicleDto,
    ZoneDto,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{
    Alert, Device, EntityRef, FleetError, SensorReading, UsageRecord, UsageStatus, Vehicle, Zone,
};
use fleet_alert::AlertRule;
use fleet_geo::NearbyHit;
use fleet_ingest::IngestReceipt;
use fleet_query::{DeviceStatusView, FleetSummary};
use fleet_telemetry::MetricsSnapshot;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// 成功响应
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 错误码对应的 HTTP 状态码
pub fn status_for(err: &FleetError) -> StatusCode {
    match err {
        FleetError::NotFound { .. } => StatusCode::NOT_FOUND,
        FleetError::Conflict(_)
        | FleetError::DuplicateReading { .. }
        | FleetError::AlreadyResolved { .. } => StatusCode::CONFLICT,
        FleetError::UnknownDevice(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FleetError::Contention { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FleetError::Validation(_) => StatusCode::BAD_REQUEST,
        FleetError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        FleetError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 领域错误响应
pub fn fleet_error(err: FleetError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(target: "fleet.api", code = err.code(), error = %err, "request_failed");
    }
    (
        status,
        Json(ApiResponse::<()>::error(err.code(), err.to_string())),
    )
        .into_response()
}

pub fn vehicle_to_dto(vehicle: Vehicle) -> VehicleDto {
    let battery_low = vehicle.is_battery_low();
    let point = vehicle.location.point;
    VehicleDto {
        plate: vehicle.plate,
        model: vehicle.model,
        owner_id: vehicle.owner_id,
        chassis: vehicle.documents.chassis,
        engine: vehicle.documents.engine,
        registration: vehicle.documents.registration,
        reference_price: vehicle.documents.reference_price,
        zone: vehicle.location.zone,
        latitude: point.map(|point| point.latitude),
        longitude: point.map(|point| point.longitude),
        slot: vehicle.location.slot,
        sector: vehicle.location.sector,
        floor: vehicle.location.floor,
        status: vehicle.status.as_str().to_string(),
        battery_level: vehicle.battery_level,
        battery_low,
        current_user: vehicle.current_user,
        retired: vehicle.retired,
        updated_at_ms: vehicle.updated_at_ms,
    }
}

pub fn device_to_dto(device: Device) -> DeviceDto {
    let point = device.location.point;
    DeviceDto {
        device_id: device.device_id,
        name: device.name,
        device_type: device.device_type.as_str().to_string(),
        status: device.status.as_str().to_string(),
        zone: device.location.zone,
        latitude: point.map(|point| point.latitude),
        longitude: point.map(|point| point.longitude),
        description: device.location.description,
        config: device.config.into_iter().collect::<Map<String, Value>>(),
        last_communication_ms: device.last_communication_ms,
        retired: device.retired,
    }
}

pub fn reading_to_dto(reading: SensorReading) -> ReadingDto {
    ReadingDto {
        reading_id: reading.reading_id,
        device_id: reading.device_id,
        device_type: reading.device_type.as_str().to_string(),
        reading_type: reading.reading_type,
        value: reading.value,
        unit: reading.unit,
        ts_ms: reading.ts_ms,
        received_at_ms: reading.received_at_ms,
        raw_payload: reading.raw_payload,
        alert_ids: reading.alert_ids,
    }
}

/// `now_ms` 用于计算活动告警的持续分钟数。
pub fn alert_to_dto(alert: Alert, now_ms: i64) -> AlertDto {
    let open_minutes = alert.open_minutes(now_ms);
    AlertDto {
        alert_id: alert.alert_id,
        category: alert.category.as_str().to_string(),
        severity: alert.severity.as_str().to_string(),
        title: alert.title,
        description: alert.description,
        device_id: alert.device_id,
        vehicle_plate: alert.vehicle_plate,
        zone: alert.zone,
        active: alert.active,
        created_at_ms: alert.created_at_ms,
        source_ts_ms: alert.source_ts_ms,
        resolved_at_ms: alert.resolved_at_ms,
        resolved_by: alert.resolved_by,
        resolution_notes: alert.resolution_notes,
        reading_id: alert.reading_id,
        event_id: alert.event_id,
        rule_id: alert.rule_id,
        confidence: alert.confidence,
        open_minutes,
    }
}

pub fn rule_to_dto(rule: AlertRule) -> RuleDto {
    RuleDto {
        condition: serde_json::to_value(&rule.spec.condition).unwrap_or(Value::Null),
        rule_id: rule.rule_id,
        name: rule.spec.name,
        category: rule.spec.category.as_str().to_string(),
        severity: rule.spec.severity.as_str().to_string(),
        enabled: rule.enabled,
        title: rule.spec.title,
        description: rule.spec.description,
        cooldown_seconds: rule.spec.cooldown_seconds,
        created_at_ms: rule.created_at_ms,
    }
}

pub fn usage_to_dto(record: UsageRecord) -> UsageDto {
    let status = match record.status {
        UsageStatus::InProgress => "in_progress",
        UsageStatus::Finished => "finished",
    };
    UsageDto {
        usage_id: record.usage_id,
        plate: record.vehicle_plate,
        model: record.vehicle_model,
        user_id: record.user_id,
        user_name: record.user_name,
        started_at_ms: record.started_at_ms,
        ended_at_ms: record.ended_at_ms,
        duration_minutes: record.duration_minutes,
        origin: record.route.origin,
        destination: record.route.destination,
        distance_km: record.route.distance_km,
        status: status.to_string(),
        notes: record.notes,
    }
}

pub fn receipt_to_dto(receipt: IngestReceipt) -> IngestReceiptDto {
    IngestReceiptDto {
        reading_id: receipt.reading_id,
        event_id: receipt.event_id,
        alert_ids: receipt.alert_ids,
        duplicate: receipt.duplicate,
    }
}

pub fn zone_to_dto(zone: Zone) -> ZoneDto {
    ZoneDto {
        code: zone.code,
        name: zone.name,
        description: zone.description,
    }
}

pub fn entity_ref_to_dto(entity: EntityRef) -> EntityRefDto {
    EntityRefDto {
        kind: entity.kind.as_str().to_string(),
        id: entity.id,
    }
}

pub fn nearby_hit_to_dto(hit: NearbyHit) -> NearbyHitDto {
    NearbyHitDto {
        kind: hit.entity.kind.as_str().to_string(),
        id: hit.entity.id,
        latitude: hit.point.latitude,
        longitude: hit.point.longitude,
        distance_m: hit.distance_m,
    }
}

pub fn device_status_to_dto(view: DeviceStatusView) -> DeviceStatusDto {
    DeviceStatusDto {
        device: device_to_dto(view.device),
        latest_reading: view.latest_reading.map(reading_to_dto),
        active_alerts: view.active_alerts,
        silent_minutes: view.silent_minutes,
    }
}

pub fn summary_to_dto(summary: FleetSummary) -> FleetSummaryDto {
    FleetSummaryDto {
        total: summary.total,
        available: summary.available,
        in_use: summary.in_use,
        maintenance: summary.maintenance,
        reserved: summary.reserved,
        low_battery: summary.low_battery,
        critical_battery: summary.critical_battery,
        average_battery: summary.average_battery,
        devices_online: summary.devices_online,
        devices_offline: summary.devices_offline,
        active_alerts: summary.active_alerts,
    }
}

pub fn metrics_to_dto(snapshot: MetricsSnapshot) -> MetricsSnapshotDto {
    MetricsSnapshotDto {
        readings_ingested: snapshot.readings_ingested,
        readings_duplicate: snapshot.readings_duplicate,
        readings_rejected: snapshot.readings_rejected,
        events_recorded: snapshot.events_recorded,
        alerts_created: snapshot.alerts_created,
        alerts_suppressed: snapshot.alerts_suppressed,
        alerts_resolved: snapshot.alerts_resolved,
        rule_failures: snapshot.rule_failures,
        lock_contention: snapshot.lock_contention,
        deadline_exceeded: snapshot.deadline_exceeded,
        index_rebuilds: snapshot.index_rebuilds,
        devices_marked_offline: snapshot.devices_marked_offline,
        ingest_latency_ms_total: snapshot.ingest_latency_ms_total,
        ingest_latency_ms_count: snapshot.ingest_latency_ms_count,
    }
}

#[cfg(test)]
mod tests {
    use super::status_for;
    use axum::http::StatusCode;
    use domain::{EntityKind, FleetError};

    #[test]
    fn error_codes_map_to_status() {
        assert_eq!(
            status_for(&FleetError::not_found(EntityKind::Zone, "Z9")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&FleetError::AlreadyResolved {
                alert_id: "ALR-20231114-000001".to_string(),
                resolved_at_ms: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&FleetError::UnknownDevice("X".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&FleetError::DeadlineExceeded),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
