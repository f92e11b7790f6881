//! 用户内存存储实现

use crate::in_memory::table::EntityTable;
use crate::models::UpsertOutcome;
use crate::traits::UserStore;
use crate::validation::validate_user;
use domain::{FleetError, User};

/// 用户内存存储
#[derive(Default)]
pub struct InMemoryUserStore {
    users: EntityTable<User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn upsert_user(&self, record: User) -> Result<UpsertOutcome, FleetError> {
        validate_user(&record)?;
        self.users.upsert(record)
    }

    async fn find_user(&self, person_id: &str) -> Result<Option<User>, FleetError> {
        self.users.get(person_id)
    }

    async fn list_users(&self) -> Result<Vec<User>, FleetError> {
        self.users.values()
    }

    async fn delete_user(&self, person_id: &str) -> Result<bool, FleetError> {
        self.users.remove(person_id)
    }
}
