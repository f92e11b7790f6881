//! 并发位置索引与后台重建
//!
//! 写操作在写锁内应用；重建期间的写操作同时记入日志。重建流程：
//! `begin_rebuild` 打开日志 → 调用方在锁外基于存储快照构建新索引 →
//! `finish_rebuild` 在写锁内回放日志并整体替换。读者不会看到构建中的索引。

use crate::index::{GeoIndex, NearbyHit, Placement};
use domain::{EntityRef, FleetError, GeoPoint};
use std::sync::RwLock;
use tracing::{info, warn};

/// 单次索引变更。
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOp {
    Upsert(EntityRef, Placement),
    Remove(EntityRef),
}

#[derive(Default)]
struct IndexState {
    index: GeoIndex,
    journal: Option<Vec<IndexOp>>,
}

impl IndexState {
    fn apply(&mut self, op: IndexOp) {
        match &op {
            IndexOp::Upsert(entity, placement) => {
                self.index.upsert(entity.clone(), placement.clone())
            }
            IndexOp::Remove(entity) => {
                self.index.remove(entity);
            }
        }
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }
}

#[derive(Default)]
pub struct LocationIndex {
    state: RwLock<IndexState>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, op: IndexOp) -> Result<(), FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        state.apply(op);
        Ok(())
    }

    pub fn by_zone(&self, zone: &str) -> Result<Vec<EntityRef>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state.index.by_zone(zone))
    }

    pub fn nearby(&self, center: &GeoPoint, radius_m: f64) -> Result<Vec<NearbyHit>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        state.index.nearby(center, radius_m)
    }

    pub fn placement(&self, entity: &EntityRef) -> Result<Option<Placement>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state.index.placement(entity).cloned())
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|state| state.index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 打开重建日志；已有重建进行中返回 `Conflict`。
    pub fn begin_rebuild(&self) -> Result<(), FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        if state.journal.is_some() {
            return Err(FleetError::conflict("index rebuild already running"));
        }
        state.journal = Some(Vec::new());
        Ok(())
    }

    /// 回放重建期间的写入并替换索引，返回回放条数。
    pub fn finish_rebuild(&self, mut fresh: GeoIndex) -> Result<usize, FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        let Some(journal) = state.journal.take() else {
            warn!(target: "fleet.geo", "index_rebuild_without_begin");
            return Err(FleetError::conflict("no index rebuild running"));
        };
        let replayed = journal.len();
        for op in journal {
            match op {
                IndexOp::Upsert(entity, placement) => fresh.upsert(entity, placement),
                IndexOp::Remove(entity) => {
                    fresh.remove(&entity);
                }
            }
        }
        state.index = fresh;
        info!(
            target: "fleet.geo",
            entries = state.index.len(),
            replayed,
            "index_swapped"
        );
        Ok(replayed)
    }

    /// 放弃进行中的重建（构建失败时调用）。
    pub fn abort_rebuild(&self) {
        if let Ok(mut state) = self.state.write() {
            state.journal = None;
        }
    }
}
