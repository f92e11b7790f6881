//! 读数、事件与告警模型
//!
//! 读数与事件只追加不修改；告警只会从活动状态转为已解决，永不删除。

use crate::assets::DeviceType;
use crate::error::FleetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// 告警级别（LOW < MEDIUM < HIGH < CRITICAL）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = FleetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(FleetError::validation(format!("unknown severity: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Iot,
    System,
    Maintenance,
    Security,
    Battery,
    Movement,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iot => "iot",
            Self::System => "system",
            Self::Maintenance => "maintenance",
            Self::Security => "security",
            Self::Battery => "battery",
            Self::Movement => "movement",
        }
    }
}

impl FromStr for AlertCategory {
    type Err = FleetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "iot" => Ok(Self::Iot),
            "system" => Ok(Self::System),
            "maintenance" => Ok(Self::Maintenance),
            "security" => Ok(Self::Security),
            "battery" => Ok(Self::Battery),
            "movement" => Ok(Self::Movement),
            other => Err(FleetError::validation(format!(
                "unknown alert category: {other}"
            ))),
        }
    }
}

/// 告警来源。冷却窗口按 (设备, 类别, 来源) 分槽：
/// 规则告警以读数源时间计，巡检告警以巡检时刻（服务端时钟）计。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertOrigin {
    Rule,
    Monitor,
}

/// 告警记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub category: AlertCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub device_id: Option<String>,
    pub vehicle_plate: Option<String>,
    pub zone: Option<String>,
    pub active: bool,
    pub created_at_ms: i64,
    /// 规则告警为触发读数的源时间戳；巡检告警为巡检时刻。
    pub source_ts_ms: i64,
    pub resolved_at_ms: Option<i64>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub reading_id: Option<String>,
    pub event_id: Option<String>,
    pub rule_id: Option<String>,
    pub confidence: Option<f64>,
    pub metadata: BTreeMap<String, Value>,
}

impl Alert {
    /// 有规则 ID 的为规则告警，其余为巡检产生。
    pub fn origin(&self) -> AlertOrigin {
        if self.rule_id.is_some() {
            AlertOrigin::Rule
        } else {
            AlertOrigin::Monitor
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at_ms.is_some()
    }

    /// 告警持续时长（已解决则到解决时刻为止）。
    pub fn open_duration_ms(&self, now_ms: i64) -> i64 {
        let end = self.resolved_at_ms.unwrap_or(now_ms);
        (end - self.created_at_ms).max(0)
    }

    pub fn open_minutes(&self, now_ms: i64) -> i64 {
        self.open_duration_ms(now_ms) / 60_000
    }
}

/// 传感器读数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub reading_id: String,
    pub device_id: String,
    pub device_type: DeviceType,
    pub reading_type: String,
    pub value: f64,
    pub unit: String,
    pub ts_ms: i64,
    pub received_at_ms: i64,
    pub raw_payload: Value,
    pub processed: bool,
    pub alert_ids: Vec<String>,
}

impl SensorReading {
    /// 同一去重键下，值与原始报文一致即视为同一条读数。
    pub fn same_content(&self, value: f64, raw_payload: &Value) -> bool {
        self.value == value && &self.raw_payload == raw_payload
    }
}

/// IoT 离散事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IotEvent {
    pub event_id: String,
    pub event_type: String,
    pub ts_ms: i64,
    pub device_id: String,
    pub payload: Value,
    pub reading_id: String,
    pub alert_id: Option<String>,
    pub processed: bool,
}
