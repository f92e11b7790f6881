//! 验证辅助函数
//!
//! 写入前的字段校验，失败统一返回 `FleetError::Validation`：
//! - ensure_key：标识键非空
//! - validate_vehicle / validate_device / validate_user：实体字段范围
//! - validate_usage_close：归还时间不早于借出时间

use domain::{Device, FleetError, UsageRecord, User, Vehicle};

/// 验证标识键非空且无首尾空白。
pub fn ensure_key(field: &str, value: &str) -> Result<(), FleetError> {
    if value.trim().is_empty() {
        return Err(FleetError::validation(format!("{field} required")));
    }
    if value.trim() != value {
        return Err(FleetError::validation(format!(
            "{field} must not contain surrounding whitespace"
        )));
    }
    Ok(())
}

pub fn validate_vehicle(vehicle: &Vehicle) -> Result<(), FleetError> {
    ensure_key("plate", &vehicle.plate)?;
    if vehicle.plate != Vehicle::normalize_plate(&vehicle.plate) {
        return Err(FleetError::validation("plate must be upper case"));
    }
    ensure_key("zone", &vehicle.location.zone)?;
    if vehicle.battery_level > 100 {
        return Err(FleetError::validation(format!(
            "battery level out of range: {}",
            vehicle.battery_level
        )));
    }
    if let Some(point) = &vehicle.location.point {
        point.validate()?;
    }
    if let Some(price) = vehicle.documents.reference_price
        && !(price.is_finite() && price >= 0.0)
    {
        return Err(FleetError::validation("reference price must be non-negative"));
    }
    Ok(())
}

pub fn validate_device(device: &Device) -> Result<(), FleetError> {
    ensure_key("device_id", &device.device_id)?;
    ensure_key("zone", &device.location.zone)?;
    if device.name.trim().is_empty() {
        return Err(FleetError::validation("device name required"));
    }
    if let Some(point) = &device.location.point {
        point.validate()?;
    }
    Ok(())
}

pub fn validate_user(user: &User) -> Result<(), FleetError> {
    ensure_key("person_id", &user.person_id)?;
    if user.name.trim().is_empty() {
        return Err(FleetError::validation("user name required"));
    }
    Ok(())
}

/// 关闭用车记录前校验时间与状态。
pub fn validate_usage_close(record: &UsageRecord) -> Result<(), FleetError> {
    let ended = record
        .ended_at_ms
        .ok_or_else(|| FleetError::validation("end time required"))?;
    if ended < record.started_at_ms {
        return Err(FleetError::validation(format!(
            "usage {} ends before it starts",
            record.usage_id
        )));
    }
    Ok(())
}
