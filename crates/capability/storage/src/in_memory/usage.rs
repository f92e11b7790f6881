//! 用车记录内存存储实现
//!
//! 记录借出时创建、归还时关闭，关闭后不再接受修改。

use crate::traits::UsageStore;
use crate::validation::{ensure_key, validate_usage_close};
use domain::{FleetError, UsageRecord, UsageStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// 用车记录内存存储
#[derive(Default)]
pub struct InMemoryUsageStore {
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn create_usage(&self, record: UsageRecord) -> Result<UsageRecord, FleetError> {
        ensure_key("usage_id", &record.usage_id)?;
        if record.status != UsageStatus::InProgress {
            return Err(FleetError::validation("new usage must be in progress"));
        }
        let mut records = self
            .records
            .write()
            .map_err(|_| FleetError::lock_failed())?;
        if records.contains_key(&record.usage_id) {
            return Err(FleetError::conflict(format!(
                "usage {} exists",
                record.usage_id
            )));
        }
        records.insert(record.usage_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_usage(&self, usage_id: &str) -> Result<Option<UsageRecord>, FleetError> {
        let records = self.records.read().map_err(|_| FleetError::lock_failed())?;
        Ok(records.get(usage_id).cloned())
    }

    async fn close_usage(&self, record: UsageRecord) -> Result<UsageRecord, FleetError> {
        validate_usage_close(&record)?;
        let mut records = self
            .records
            .write()
            .map_err(|_| FleetError::lock_failed())?;
        let existing = records.get_mut(&record.usage_id).ok_or_else(|| {
            FleetError::not_found(domain::EntityKind::Usage, record.usage_id.clone())
        })?;
        if existing.is_finished() {
            return Err(FleetError::conflict(format!(
                "usage {} already finished",
                record.usage_id
            )));
        }
        if existing.started_at_ms != record.started_at_ms
            || existing.vehicle_plate != record.vehicle_plate
            || existing.user_id != record.user_id
        {
            return Err(FleetError::conflict(format!(
                "usage {} identity fields cannot change",
                record.usage_id
            )));
        }
        let mut closed = record;
        closed.status = UsageStatus::Finished;
        *existing = closed.clone();
        Ok(closed)
    }

    async fn list_usage_by_vehicle(&self, plate: &str) -> Result<Vec<UsageRecord>, FleetError> {
        let records = self.records.read().map_err(|_| FleetError::lock_failed())?;
        let mut items: Vec<UsageRecord> = records
            .values()
            .filter(|item| item.vehicle_plate == plate)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.started_at_ms
                .cmp(&a.started_at_ms)
                .then_with(|| b.usage_id.cmp(&a.usage_id))
        });
        Ok(items)
    }
}
