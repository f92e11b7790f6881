pub mod assets;
pub mod clock;
pub mod data;
pub mod error;
pub mod ids;

pub use assets::{
    Address, Device, DeviceLocation, DeviceStatus, DeviceType, EntityKind, EntityRef, GeoPoint,
    RouteSummary, UsageMetrics, UsageRecord, UsageStatus, User, UserRole, Vehicle,
    VehicleDocuments, VehicleLocation, VehicleStatus, Zone,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use data::{Alert, AlertCategory, AlertOrigin, IotEvent, SensorReading, Severity};
pub use error::FleetError;
pub use ids::IdGenerator;

use std::time::{Duration, Instant};

/// 请求上下文：所有能力模块共享的执行上下文。
///
/// `deadline` 为空表示不设截止时间；接入、查询与跨实体写入都会在
/// 等待锁或提交前检查截止时间。
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor_id: String,
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// 构造显式身份的请求上下文。
    pub fn new(actor_id: impl Into<String>, deadline: Option<Instant>) -> Self {
        Self {
            actor_id: actor_id.into(),
            deadline,
        }
    }

    /// 系统内部任务（巡检、MQTT 接入）使用的上下文。
    pub fn system() -> Self {
        Self::new("system", None)
    }

    /// 在当前上下文上设置相对超时。
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// 距离截止时间的剩余时长；未设置截止时间返回 `None`。
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// 截止时间已过则返回 `DeadlineExceeded`。
    pub fn ensure_live(&self) -> Result<(), FleetError> {
        if self.is_expired() {
            return Err(FleetError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for RequestContext {
    /// 空上下文（仅用于测试或占位）。
    fn default() -> Self {
        Self::system()
    }
}
