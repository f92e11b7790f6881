//! 存储层数据模型
//!
//! 实体本身定义在 `domain`，这里只放存储接口用到的辅助结构：
//! - UpsertOutcome：写入结果
//! - IngestCommit：一次接入的原子提交单元
//! - AlertQuery：告警列表过滤条件

use domain::{Alert, AlertCategory, IotEvent, SensorReading, Severity};

/// 按标识键写入的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// 新旧记录完全一致，未发生写入。
    Unchanged,
}

/// 一次接入产生的全部记录：读数、可选事件与触发的告警。
///
/// 要么全部可见，要么全部不可见。
#[derive(Debug, Clone)]
pub struct IngestCommit {
    pub reading: SensorReading,
    pub event: Option<IotEvent>,
    pub alerts: Vec<Alert>,
}

/// 告警列表过滤条件。
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub active_only: bool,
    pub zone: Option<String>,
    pub category: Option<AlertCategory>,
    pub min_severity: Option<Severity>,
    pub device_id: Option<String>,
}

impl AlertQuery {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if self.active_only && !alert.active {
            return false;
        }
        if let Some(zone) = self.zone.as_deref()
            && alert.zone.as_deref() != Some(zone)
        {
            return false;
        }
        if let Some(category) = self.category
            && alert.category != category
        {
            return false;
        }
        if let Some(min) = self.min_severity
            && alert.severity < min
        {
            return false;
        }
        if let Some(device_id) = self.device_id.as_deref()
            && alert.device_id.as_deref() != Some(device_id)
        {
            return false;
        }
        true
    }
}
