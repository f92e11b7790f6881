//! 输入验证辅助函数
//!
//! - normalize_required / normalize_optional：去除首尾空格并检查非空
//! - parse_field：枚举字段（状态、类型、级别）解析
//! - vehicle_location / device_location：位置请求体转领域模型
//!
//! 失败返回 bad_request_error 响应。

use crate::utils::response::bad_request_error;
use api_contract::LocationRequest;
use axum::response::Response;
use domain::{DeviceLocation, FleetError, GeoPoint, VehicleLocation};
use std::str::FromStr;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

/// 验证可选字段，如果提供则去除空格并检查非空
pub fn normalize_optional(value: Option<String>, field: &str) -> Result<Option<String>, Response> {
    match value {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(bad_request_error(format!("{field} required")));
            }
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}

/// 解析枚举字段（大小写不敏感）
pub fn parse_field<T>(value: &str) -> Result<T, Response>
where
    T: FromStr<Err = FleetError>,
{
    value
        .parse::<T>()
        .map_err(|err| bad_request_error(err.to_string()))
}

/// 经纬度必须同时给出或同时缺省
fn point_from(location: &LocationRequest) -> Result<Option<GeoPoint>, Response> {
    match (location.latitude, location.longitude) {
        (Some(latitude), Some(longitude)) => {
            let point = GeoPoint::new(latitude, longitude);
            point
                .validate()
                .map_err(|err| bad_request_error(err.to_string()))?;
            Ok(Some(point))
        }
        (None, None) => Ok(None),
        _ => Err(bad_request_error(
            "latitude and longitude must be given together",
        )),
    }
}

pub fn vehicle_location(location: LocationRequest) -> Result<VehicleLocation, Response> {
    let point = point_from(&location)?;
    Ok(VehicleLocation {
        zone: normalize_required(location.zone, "zone")?,
        point,
        slot: location.slot,
        sector: location.sector,
        floor: location.floor,
        description: location.description,
    })
}

pub fn device_location(location: LocationRequest) -> Result<DeviceLocation, Response> {
    let point = point_from(&location)?;
    Ok(DeviceLocation {
        zone: normalize_required(location.zone, "zone")?,
        point,
        description: location.description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::VehicleStatus;

    fn location(latitude: Option<f64>, longitude: Option<f64>) -> LocationRequest {
        LocationRequest {
            zone: " A1 ".to_string(),
            latitude,
            longitude,
            slot: None,
            sector: None,
            floor: None,
            description: None,
        }
    }

    #[test]
    fn location_requires_both_coordinates() {
        assert!(vehicle_location(location(Some(-23.5505), None)).is_err());
        let parsed = vehicle_location(location(Some(-23.5505), Some(-46.6333)))
            .unwrap_or_else(|_| panic!("location"));
        assert_eq!(parsed.zone, "A1");
        assert!(parsed.point.is_some());
        let parsed = device_location(location(None, None)).unwrap_or_else(|_| panic!("location"));
        assert!(parsed.point.is_none());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(device_location(location(Some(95.0), Some(0.0))).is_err());
    }

    #[test]
    fn enum_fields_parse() {
        assert_eq!(
            parse_field::<VehicleStatus>("in-use").ok(),
            Some(VehicleStatus::InUse)
        );
        assert!(parse_field::<VehicleStatus>("parked").is_err());
    }
}
