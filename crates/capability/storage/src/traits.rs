//! 存储接口 Trait 定义
//!
//! 定义所有资源存储的异步接口：
//! - AddressStore / UserStore / ZoneStore：主数据
//! - VehicleStore / DeviceStore：带位置的资产（软删除由调用方写入 retired 标记）
//! - UsageStore：用车记录
//! - ReadingStore：读数与事件（只追加，随告警原子提交）
//! - AlertStore：告警（只会被解决，不会被删除）
//!
//! 设计原则：
//! - 所有接口返回 FleetError
//! - 单条记录整体替换，读者只会看到完整记录
//! - 使用 async_trait 支持动态分发

use crate::models::{AlertQuery, IngestCommit, UpsertOutcome};
use async_trait::async_trait;
use domain::{
    Address, Alert, AlertCategory, AlertOrigin, Device, FleetError, IotEvent, SensorReading,
    UsageRecord, User, Vehicle, Zone,
};

/// 地址存储接口
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// 写入地址；已存在且内容不同返回 `Conflict`。
    async fn upsert_address(&self, record: Address) -> Result<UpsertOutcome, FleetError>;

    async fn find_address(&self, postal_code: &str) -> Result<Option<Address>, FleetError>;

    /// 物理删除
    async fn delete_address(&self, postal_code: &str) -> Result<bool, FleetError>;
}

/// 用户存储接口
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert_user(&self, record: User) -> Result<UpsertOutcome, FleetError>;

    async fn find_user(&self, person_id: &str) -> Result<Option<User>, FleetError>;

    async fn list_users(&self) -> Result<Vec<User>, FleetError>;

    /// 物理删除
    async fn delete_user(&self, person_id: &str) -> Result<bool, FleetError>;
}

/// 分区存储接口
#[async_trait]
pub trait ZoneStore: Send + Sync {
    async fn upsert_zone(&self, record: Zone) -> Result<UpsertOutcome, FleetError>;

    async fn find_zone(&self, code: &str) -> Result<Option<Zone>, FleetError>;

    async fn list_zones(&self) -> Result<Vec<Zone>, FleetError>;
}

/// 车辆存储接口
#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn upsert_vehicle(&self, record: Vehicle) -> Result<UpsertOutcome, FleetError>;

    async fn find_vehicle(&self, plate: &str) -> Result<Option<Vehicle>, FleetError>;

    /// 列出所有车辆（含已退役），按车牌排序。
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, FleetError>;
}

/// 设备存储接口
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn upsert_device(&self, record: Device) -> Result<UpsertOutcome, FleetError>;

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>, FleetError>;

    /// 列出所有设备（含已退役），按设备 ID 排序。
    async fn list_devices(&self) -> Result<Vec<Device>, FleetError>;
}

/// 用车记录存储接口
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// 新建进行中的用车记录；ID 已存在返回 `Conflict`。
    async fn create_usage(&self, record: UsageRecord) -> Result<UsageRecord, FleetError>;

    async fn find_usage(&self, usage_id: &str) -> Result<Option<UsageRecord>, FleetError>;

    /// 关闭用车记录；已关闭返回 `Conflict`，结束早于开始返回 `Validation`。
    async fn close_usage(&self, record: UsageRecord) -> Result<UsageRecord, FleetError>;

    /// 指定车辆的用车记录，按开始时间倒序。
    async fn list_usage_by_vehicle(&self, plate: &str) -> Result<Vec<UsageRecord>, FleetError>;
}

/// 读数与事件存储接口
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn find_reading(&self, reading_id: &str) -> Result<Option<SensorReading>, FleetError>;

    /// 按去重键（设备 + 源时间戳）查找读数。
    async fn find_reading_by_key(
        &self,
        device_id: &str,
        ts_ms: i64,
    ) -> Result<Option<SensorReading>, FleetError>;

    /// 设备最近的读数，按源时间戳倒序。
    async fn list_readings(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, FleetError>;

    async fn count_readings(&self) -> Result<usize, FleetError>;

    async fn find_event(&self, event_id: &str) -> Result<Option<IotEvent>, FleetError>;

    async fn list_events(&self, device_id: &str, limit: usize)
    -> Result<Vec<IotEvent>, FleetError>;

    /// 原子提交读数、事件与告警。
    ///
    /// 去重键已存在返回 `DuplicateReading`（携带已有读数 ID）；任一 ID 冲突返回
    /// `Conflict`。失败时不写入任何记录。
    async fn commit_ingest(&self, commit: IngestCommit) -> Result<(), FleetError>;
}

/// 告警存储接口
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// 写入不关联读数的告警（如离线巡检）；ID 已存在返回 `Conflict`。
    async fn insert_alert(&self, alert: Alert) -> Result<(), FleetError>;

    async fn find_alert(&self, alert_id: &str) -> Result<Option<Alert>, FleetError>;

    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, FleetError>;

    /// 同设备、同类别、同来源最近一次告警的时间戳（见 `Alert::source_ts_ms`）。
    async fn last_alert_ts(
        &self,
        device_id: &str,
        category: AlertCategory,
        origin: AlertOrigin,
    ) -> Result<Option<i64>, FleetError>;

    /// 解决告警；已解决返回 `AlreadyResolved` 且记录保持不变。
    async fn resolve_alert(
        &self,
        alert_id: &str,
        resolved_by: &str,
        notes: Option<String>,
        resolved_at_ms: i64,
    ) -> Result<Alert, FleetError>;

    async fn count_alerts(&self) -> Result<usize, FleetError>;
}
