//! 车辆内存存储实现
//!
//! 功能：
//! - 按车牌整体替换
//! - 底盘号 / 发动机号一经设置不可修改

use crate::in_memory::table::EntityTable;
use crate::models::UpsertOutcome;
use crate::traits::VehicleStore;
use crate::validation::validate_vehicle;
use domain::{FleetError, Vehicle};

/// 车辆内存存储
#[derive(Default)]
pub struct InMemoryVehicleStore {
    vehicles: EntityTable<Vehicle>,
}

impl InMemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VehicleStore for InMemoryVehicleStore {
    async fn upsert_vehicle(&self, record: Vehicle) -> Result<UpsertOutcome, FleetError> {
        validate_vehicle(&record)?;
        self.vehicles.upsert(record)
    }

    async fn find_vehicle(&self, plate: &str) -> Result<Option<Vehicle>, FleetError> {
        self.vehicles.get(&Vehicle::normalize_plate(plate))
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, FleetError> {
        self.vehicles.values()
    }
}
