//! 资产与主数据模型
//!
//! 车辆、设备、用户、地址、分区以及用车记录。所有可选引用使用 `Option`，
//! 时间统一为 Unix 毫秒。

use crate::error::FleetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 实体类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Address,
    User,
    Vehicle,
    Device,
    Zone,
    Alert,
    Reading,
    Event,
    Usage,
    Rule,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::User => "user",
            Self::Vehicle => "vehicle",
            Self::Device => "device",
            Self::Zone => "zone",
            Self::Alert => "alert",
            Self::Reading => "reading",
            Self::Event => "event",
            Self::Usage => "usage",
            Self::Rule => "rule",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 带类型的实体引用，用于位置索引。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn vehicle(plate: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Vehicle,
            id: plate.into(),
        }
    }

    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Device,
            id: device_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// 由存储表托管的实体：标识键 + 不可变字段校验。
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    const KIND: EntityKind;

    fn key(&self) -> String;

    /// 替换已有记录前校验不可变字段；违反时返回 `Conflict`。
    fn check_immutable(&self, _existing: &Self) -> Result<(), FleetError> {
        Ok(())
    }
}

/// WGS84 坐标。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<(), FleetError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(FleetError::validation(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(FleetError::validation(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// 地址（以邮编为键，创建后不可修改）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub postal_code: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub district: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
}

impl Entity for Address {
    const KIND: EntityKind = EntityKind::Address;

    fn key(&self) -> String {
        self.postal_code.clone()
    }

    fn check_immutable(&self, existing: &Self) -> Result<(), FleetError> {
        if self != existing {
            return Err(FleetError::conflict(format!(
                "address {} is immutable",
                self.postal_code
            )));
        }
        Ok(())
    }
}

/// 停车场分区。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

impl Entity for Zone {
    const KIND: EntityKind = EntityKind::Zone;

    fn key(&self) -> String {
        self.code.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    MotionSensor,
    Camera,
    LockActuator,
    AlarmActuator,
    TemperatureSensor,
    BatterySensor,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MotionSensor => "motion_sensor",
            Self::Camera => "camera",
            Self::LockActuator => "lock_actuator",
            Self::AlarmActuator => "alarm_actuator",
            Self::TemperatureSensor => "temperature_sensor",
            Self::BatterySensor => "battery_sensor",
        }
    }
}

impl FromStr for DeviceType {
    type Err = FleetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "motion_sensor" => Ok(Self::MotionSensor),
            "camera" => Ok(Self::Camera),
            "lock_actuator" => Ok(Self::LockActuator),
            "alarm_actuator" => Ok(Self::AlarmActuator),
            "temperature_sensor" => Ok(Self::TemperatureSensor),
            "battery_sensor" => Ok(Self::BatterySensor),
            other => Err(FleetError::validation(format!("unknown device type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Maintenance => "maintenance",
            Self::Error => "error",
        }
    }
}

impl FromStr for DeviceStatus {
    type Err = FleetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            "maintenance" => Ok(Self::Maintenance),
            "error" => Ok(Self::Error),
            other => Err(FleetError::validation(format!(
                "unknown device status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub zone: String,
    pub point: Option<GeoPoint>,
    pub description: Option<String>,
}

/// IoT 设备。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub location: DeviceLocation,
    /// 类型相关配置（灵敏度、分辨率、报警温度等）。
    pub config: BTreeMap<String, Value>,
    pub last_communication_ms: Option<i64>,
    pub retired: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Device {
    /// 失联计时起点：最后通讯时间；从未通讯则取登记时间。
    pub fn silent_since_ms(&self) -> i64 {
        self.last_communication_ms.unwrap_or(self.created_at_ms)
    }

    /// 失联超过 `threshold_ms` 视为离线候选。
    pub fn is_silent(&self, now_ms: i64, threshold_ms: i64) -> bool {
        now_ms - self.silent_since_ms() > threshold_ms
    }
}

impl Entity for Device {
    const KIND: EntityKind = EntityKind::Device;

    fn key(&self) -> String {
        self.device_id.clone()
    }

    fn check_immutable(&self, existing: &Self) -> Result<(), FleetError> {
        if self.device_type != existing.device_type {
            return Err(FleetError::conflict(format!(
                "device {} type cannot change from {} to {}",
                self.device_id,
                existing.device_type.as_str(),
                self.device_type.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InUse,
    Maintenance,
    Reserved,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Maintenance => "maintenance",
            Self::Reserved => "reserved",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = FleetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "available" => Ok(Self::Available),
            "in_use" => Ok(Self::InUse),
            "maintenance" => Ok(Self::Maintenance),
            "reserved" => Ok(Self::Reserved),
            "inactive" => Ok(Self::Inactive),
            other => Err(FleetError::validation(format!(
                "unknown vehicle status: {other}"
            ))),
        }
    }
}

/// 车辆证件。底盘号与发动机号一经设置不可修改。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleDocuments {
    pub chassis: Option<String>,
    pub engine: Option<String>,
    pub registration: Option<String>,
    pub reference_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleLocation {
    pub zone: String,
    pub point: Option<GeoPoint>,
    pub slot: Option<String>,
    pub sector: Option<String>,
    pub floor: Option<i32>,
    pub description: Option<String>,
}

impl VehicleLocation {
    pub fn in_zone(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            point: None,
            slot: None,
            sector: None,
            floor: None,
            description: None,
        }
    }
}

pub const BATTERY_LOW: u8 = 20;
pub const BATTERY_CRITICAL: u8 = 10;

/// 车辆（以车牌为键，车牌统一大写）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub model: String,
    pub owner_id: Option<String>,
    pub documents: VehicleDocuments,
    pub location: VehicleLocation,
    pub status: VehicleStatus,
    pub battery_level: u8,
    pub current_user: Option<String>,
    pub retired: bool,
    pub updated_at_ms: i64,
}

impl Vehicle {
    pub fn normalize_plate(plate: &str) -> String {
        plate.trim().to_ascii_uppercase()
    }

    pub fn is_battery_low(&self) -> bool {
        self.battery_level < BATTERY_LOW
    }

    pub fn is_battery_critical(&self) -> bool {
        self.battery_level < BATTERY_CRITICAL
    }

    pub fn is_available(&self) -> bool {
        !self.retired && self.status == VehicleStatus::Available
    }
}

fn locked_field(
    plate: &str,
    field: &str,
    incoming: &Option<String>,
    existing: &Option<String>,
) -> Result<(), FleetError> {
    if let Some(existing) = existing
        && incoming.as_ref() != Some(existing)
    {
        return Err(FleetError::conflict(format!(
            "vehicle {plate} {field} number is immutable"
        )));
    }
    Ok(())
}

impl Entity for Vehicle {
    const KIND: EntityKind = EntityKind::Vehicle;

    fn key(&self) -> String {
        self.plate.clone()
    }

    fn check_immutable(&self, existing: &Self) -> Result<(), FleetError> {
        locked_field(
            &self.plate,
            "chassis",
            &self.documents.chassis,
            &existing.documents.chassis,
        )?;
        locked_field(
            &self.plate,
            "engine",
            &self.documents.engine,
            &existing.documents.engine,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Operator,
    Admin,
}

/// 用户（以证件号为键）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub person_id: String,
    pub name: String,
    /// `yyyy-mm-dd`，创建后不可修改。
    pub birth_date: Option<String>,
    pub postal_code: Option<String>,
    pub vehicle_plate: Option<String>,
    pub role: UserRole,
    pub active: bool,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> String {
        self.person_id.clone()
    }

    fn check_immutable(&self, existing: &Self) -> Result<(), FleetError> {
        if existing.birth_date.is_some() && self.birth_date != existing.birth_date {
            return Err(FleetError::conflict(format!(
                "user {} birth date is immutable",
                self.person_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub average_speed_kmh: Option<f64>,
    pub battery_consumed: Option<u8>,
    pub stops: Option<u32>,
}

/// 用车记录：借出时创建，归还时关闭，关闭后不可修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub usage_id: String,
    pub vehicle_plate: String,
    pub vehicle_model: String,
    pub user_id: String,
    pub user_name: String,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub route: RouteSummary,
    pub status: UsageStatus,
    pub metrics: Option<UsageMetrics>,
    pub notes: Option<String>,
}

impl UsageRecord {
    pub fn is_finished(&self) -> bool {
        self.status == UsageStatus::Finished
    }
}
