//! 实体登记
//!
//! 存储之上的写入门面：
//! - 单实体单写者（`EntityLocks`，退避重试 + 截止时间）
//! - 先写存储、后更新位置索引，两步在可见性闸门的写侧完成；
//!   所有读路径持有读侧，因此读者要么同时看到两者，要么都看不到
//! - 分区引用必须指向已定义的分区

pub mod devices;
pub mod locks;
pub mod master;
pub mod rebuild;
pub mod seed;
pub mod usage;
pub mod vehicles;

pub use locks::{EntityGuard, EntityLocks, RetryPolicy};
pub use rebuild::{RebuildReport, spawn_index_rebuild};
pub use seed::{SeedData, SeedReport};
pub use usage::{CheckinRequest, CheckoutRequest};
pub use vehicles::VehicleStatusUpdate;

use domain::{
    Clock, Device, EntityKind, EntityRef, FleetError, GeoPoint, IdGenerator, RequestContext,
    SystemClock, Vehicle,
};
use fleet_geo::{IndexOp, LocationIndex, NearbyHit, Placement};
use fleet_storage::{
    AddressStore, AlertStore, DeviceStore, InMemoryAddressStore, InMemoryDeviceStore,
    InMemoryEventLedger, InMemoryUsageStore, InMemoryUserStore, InMemoryVehicleStore,
    InMemoryZoneStore, ReadingStore, UsageStore, UserStore, VehicleStore, ZoneStore,
};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 注册表使用的全部存储。
#[derive(Clone)]
pub struct RegistryStores {
    pub addresses: Arc<dyn AddressStore>,
    pub users: Arc<dyn UserStore>,
    pub zones: Arc<dyn ZoneStore>,
    pub vehicles: Arc<dyn VehicleStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub usage: Arc<dyn UsageStore>,
    pub readings: Arc<dyn ReadingStore>,
    pub alerts: Arc<dyn AlertStore>,
}

impl RegistryStores {
    /// 内存实现；读数与告警共用同一个账本以支持原子提交。
    pub fn in_memory() -> Self {
        let ledger = Arc::new(InMemoryEventLedger::new());
        Self {
            addresses: Arc::new(InMemoryAddressStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            zones: Arc::new(InMemoryZoneStore::new()),
            vehicles: Arc::new(InMemoryVehicleStore::new()),
            devices: Arc::new(InMemoryDeviceStore::new()),
            usage: Arc::new(InMemoryUsageStore::new()),
            readings: ledger.clone(),
            alerts: ledger,
        }
    }
}

pub struct Registry {
    stores: RegistryStores,
    index: LocationIndex,
    locks: EntityLocks,
    gate: RwLock<()>,
    ids: Arc<IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(
        stores: RegistryStores,
        policy: RetryPolicy,
        ids: Arc<IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            index: LocationIndex::new(),
            locks: EntityLocks::new(policy),
            gate: RwLock::new(()),
            ids,
            clock,
        }
    }

    /// 内存存储 + 系统时钟 + 默认重试策略。
    pub fn in_memory() -> Self {
        Self::new(
            RegistryStores::in_memory(),
            RetryPolicy::default(),
            Arc::new(IdGenerator::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn stores(&self) -> &RegistryStores {
        &self.stores
    }

    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// 读侧闸门：等待时长受截止时间约束。
    pub async fn read_gate(
        &self,
        ctx: &RequestContext,
    ) -> Result<RwLockReadGuard<'_, ()>, FleetError> {
        ctx.ensure_live()?;
        match ctx.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, self.gate.read())
                .await
                .map_err(|_| FleetError::DeadlineExceeded),
            None => Ok(self.gate.read().await),
        }
    }

    /// 写侧闸门；拿到后再检查一次截止时间，过期则不提交。
    pub async fn write_gate(
        &self,
        ctx: &RequestContext,
    ) -> Result<RwLockWriteGuard<'_, ()>, FleetError> {
        ctx.ensure_live()?;
        let guard = match ctx.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, self.gate.write())
                .await
                .map_err(|_| FleetError::DeadlineExceeded)?,
            None => self.gate.write().await,
        };
        ctx.ensure_live()?;
        Ok(guard)
    }

    pub(crate) async fn ensure_zone(&self, zone: &str) -> Result<(), FleetError> {
        match self.stores.zones.find_zone(zone).await? {
            Some(_) => Ok(()),
            None => Err(FleetError::not_found(EntityKind::Zone, zone)),
        }
    }

    pub(crate) fn reindex(&self, op: IndexOp) -> Result<(), FleetError> {
        self.index.apply(op)
    }

    pub fn location_index(&self) -> &LocationIndex {
        &self.index
    }

    /// 分区内的实体。
    pub async fn by_zone(
        &self,
        ctx: &RequestContext,
        zone: &str,
    ) -> Result<Vec<EntityRef>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.index.by_zone(zone)
    }

    /// 半径内的实体，按距离升序。
    pub async fn nearby(
        &self,
        ctx: &RequestContext,
        center: &GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbyHit>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.index.nearby(center, radius_m)
    }
}

pub(crate) fn vehicle_index_op(vehicle: &Vehicle) -> IndexOp {
    let entity = EntityRef::vehicle(vehicle.plate.clone());
    if vehicle.retired {
        return IndexOp::Remove(entity);
    }
    IndexOp::Upsert(
        entity,
        Placement {
            zone: vehicle.location.zone.clone(),
            point: vehicle.location.point,
        },
    )
}

pub(crate) fn device_index_op(device: &Device) -> IndexOp {
    let entity = EntityRef::device(device.device_id.clone());
    if device.retired {
        return IndexOp::Remove(entity);
    }
    IndexOp::Upsert(
        entity,
        Placement {
            zone: device.location.zone.clone(),
            point: device.location.point,
        },
    )
}
