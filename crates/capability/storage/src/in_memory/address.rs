//! 地址内存存储实现

use crate::in_memory::table::EntityTable;
use crate::models::UpsertOutcome;
use crate::traits::AddressStore;
use crate::validation::ensure_key;
use domain::{Address, FleetError};

/// 地址内存存储
#[derive(Default)]
pub struct InMemoryAddressStore {
    addresses: EntityTable<Address>,
}

impl InMemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AddressStore for InMemoryAddressStore {
    async fn upsert_address(&self, record: Address) -> Result<UpsertOutcome, FleetError> {
        ensure_key("postal_code", &record.postal_code)?;
        self.addresses.upsert(record)
    }

    async fn find_address(&self, postal_code: &str) -> Result<Option<Address>, FleetError> {
        self.addresses.get(postal_code)
    }

    async fn delete_address(&self, postal_code: &str) -> Result<bool, FleetError> {
        self.addresses.remove(postal_code)
    }
}
