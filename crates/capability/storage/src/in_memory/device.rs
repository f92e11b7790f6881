//! 设备内存存储实现
//!
//! 设备类型创建后不可修改；退役设备保留记录，仅打 retired 标记。

use crate::in_memory::table::EntityTable;
use crate::models::UpsertOutcome;
use crate::traits::DeviceStore;
use crate::validation::validate_device;
use domain::{Device, FleetError};

/// 设备内存存储
#[derive(Default)]
pub struct InMemoryDeviceStore {
    devices: EntityTable<Device>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn upsert_device(&self, record: Device) -> Result<UpsertOutcome, FleetError> {
        validate_device(&record)?;
        self.devices.upsert(record)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>, FleetError> {
        self.devices.get(device_id)
    }

    async fn list_devices(&self) -> Result<Vec<Device>, FleetError> {
        self.devices.values()
    }
}
