//! 按标识键整体替换的内存表
//!
//! 所有主数据与资产存储共用：写入时在表锁内完成不可变字段校验与替换，
//! 读者拿到的总是完整记录的副本。

use crate::models::UpsertOutcome;
use domain::FleetError;
use domain::assets::Entity;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct EntityTable<T: Entity> {
    rows: RwLock<HashMap<String, T>>,
}

impl<T: Entity> EntityTable<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, record: T) -> Result<UpsertOutcome, FleetError> {
        let mut rows = self.rows.write().map_err(|_| FleetError::lock_failed())?;
        let key = record.key();
        match rows.get(&key) {
            Some(existing) if *existing == record => Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                record.check_immutable(existing)?;
                rows.insert(key, record);
                Ok(UpsertOutcome::Replaced)
            }
            None => {
                rows.insert(key, record);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<T>, FleetError> {
        let rows = self.rows.read().map_err(|_| FleetError::lock_failed())?;
        Ok(rows.get(key).cloned())
    }

    pub fn remove(&self, key: &str) -> Result<bool, FleetError> {
        let mut rows = self.rows.write().map_err(|_| FleetError::lock_failed())?;
        Ok(rows.remove(key).is_some())
    }

    /// 按标识键排序的全部记录。
    pub fn values(&self) -> Result<Vec<T>, FleetError> {
        let rows = self.rows.read().map_err(|_| FleetError::lock_failed())?;
        let mut items: Vec<(String, T)> = rows
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(items.into_iter().map(|(_, value)| value).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for EntityTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
