//! 分区内存存储实现

use crate::in_memory::table::EntityTable;
use crate::models::UpsertOutcome;
use crate::traits::ZoneStore;
use crate::validation::ensure_key;
use domain::{FleetError, Zone};

/// 分区内存存储
#[derive(Default)]
pub struct InMemoryZoneStore {
    zones: EntityTable<Zone>,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn upsert_zone(&self, record: Zone) -> Result<UpsertOutcome, FleetError> {
        ensure_key("zone", &record.code)?;
        self.zones.upsert(record)
    }

    async fn find_zone(&self, code: &str) -> Result<Option<Zone>, FleetError> {
        self.zones.get(code)
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, FleetError> {
        self.zones.values()
    }
}
