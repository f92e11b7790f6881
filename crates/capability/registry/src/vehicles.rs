//! 车辆登记：写入、移动、状态更新与退役。

use crate::{Registry, vehicle_index_op};
use domain::{
    EntityKind, EntityRef, FleetError, RequestContext, Vehicle, VehicleLocation, VehicleStatus,
};
use fleet_storage::UpsertOutcome;
use tracing::info;

/// 状态 / 电量部分更新。
#[derive(Debug, Clone, Default)]
pub struct VehicleStatusUpdate {
    pub status: Option<VehicleStatus>,
    pub battery_level: Option<u8>,
}

impl Registry {
    /// 写入车辆并刷新位置索引。
    pub async fn upsert_vehicle(
        &self,
        ctx: &RequestContext,
        mut vehicle: Vehicle,
    ) -> Result<UpsertOutcome, FleetError> {
        vehicle.plate = Vehicle::normalize_plate(&vehicle.plate);
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::vehicle(vehicle.plate.clone()))
            .await?;
        self.ensure_zone(&vehicle.location.zone).await?;
        if let Some(user_id) = vehicle.current_user.as_deref()
            && self.stores().users.find_user(user_id).await?.is_none()
        {
            return Err(FleetError::not_found(EntityKind::User, user_id));
        }
        if let Some(existing) = self.stores().vehicles.find_vehicle(&vehicle.plate).await? {
            if existing.retired {
                return Err(FleetError::conflict(format!(
                    "vehicle {} is retired",
                    existing.plate
                )));
            }
            ensure_usage_transition(&existing.plate, existing.status, vehicle.status)?;
            if vehicle.current_user != existing.current_user {
                return Err(FleetError::conflict(format!(
                    "vehicle {} current user changes only through checkout and check-in",
                    existing.plate
                )));
            }
            vehicle.retired = false;
            vehicle.updated_at_ms = existing.updated_at_ms;
            if existing == vehicle {
                return Ok(UpsertOutcome::Unchanged);
            }
        }
        vehicle.updated_at_ms = self.now_ms();
        self.commit_vehicle(ctx, vehicle).await
    }

    /// 调用方已持有车辆锁。
    pub(crate) async fn commit_vehicle(
        &self,
        ctx: &RequestContext,
        vehicle: Vehicle,
    ) -> Result<UpsertOutcome, FleetError> {
        let _gate = self.write_gate(ctx).await?;
        let op = vehicle_index_op(&vehicle);
        let plate = vehicle.plate.clone();
        let zone = vehicle.location.zone.clone();
        let outcome = self.stores().vehicles.upsert_vehicle(vehicle).await?;
        self.reindex(op)?;
        info!(
            target: "fleet.registry",
            plate = %plate,
            zone = %zone,
            outcome = ?outcome,
            "vehicle_committed"
        );
        Ok(outcome)
    }

    pub async fn get_vehicle(&self, ctx: &RequestContext, plate: &str) -> Result<Vehicle, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.find_vehicle(plate).await
    }

    pub(crate) async fn find_vehicle(&self, plate: &str) -> Result<Vehicle, FleetError> {
        let plate = Vehicle::normalize_plate(plate);
        self.stores()
            .vehicles
            .find_vehicle(&plate)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Vehicle, plate))
    }

    /// 车辆列表；`include_retired` 为 false 时跳过已退役车辆。
    pub async fn list_vehicles(
        &self,
        ctx: &RequestContext,
        include_retired: bool,
    ) -> Result<Vec<Vehicle>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        let vehicles = self.stores().vehicles.list_vehicles().await?;
        Ok(vehicles
            .into_iter()
            .filter(|item| include_retired || !item.retired)
            .collect())
    }

    /// 软删除：打退役标记并从位置索引移除。重复退役不报错。
    pub async fn retire_vehicle(&self, ctx: &RequestContext, plate: &str) -> Result<Vehicle, FleetError> {
        let plate = Vehicle::normalize_plate(plate);
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::vehicle(plate.clone()))
            .await?;
        let mut vehicle = self.find_vehicle(&plate).await?;
        if vehicle.retired {
            return Ok(vehicle);
        }
        if vehicle.status == VehicleStatus::InUse {
            return Err(FleetError::conflict(format!(
                "vehicle {plate} is in use and cannot be retired"
            )));
        }
        vehicle.retired = true;
        vehicle.status = VehicleStatus::Inactive;
        vehicle.updated_at_ms = self.now_ms();
        self.commit_vehicle(ctx, vehicle.clone()).await?;
        info!(target: "fleet.registry", plate = %plate, "vehicle_retired");
        Ok(vehicle)
    }

    /// 移动车辆（分区、坐标、车位）。
    pub async fn update_vehicle_location(
        &self,
        ctx: &RequestContext,
        plate: &str,
        location: VehicleLocation,
    ) -> Result<Vehicle, FleetError> {
        let plate = Vehicle::normalize_plate(plate);
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::vehicle(plate.clone()))
            .await?;
        let mut vehicle = self.find_vehicle(&plate).await?;
        if vehicle.retired {
            return Err(FleetError::not_found(EntityKind::Vehicle, plate));
        }
        self.ensure_zone(&location.zone).await?;
        if let Some(point) = &location.point {
            point.validate()?;
        }
        vehicle.location = location;
        vehicle.updated_at_ms = self.now_ms();
        self.commit_vehicle(ctx, vehicle.clone()).await?;
        Ok(vehicle)
    }

    pub async fn update_vehicle_status(
        &self,
        ctx: &RequestContext,
        plate: &str,
        update: VehicleStatusUpdate,
    ) -> Result<Vehicle, FleetError> {
        let plate = Vehicle::normalize_plate(plate);
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::vehicle(plate.clone()))
            .await?;
        let mut vehicle = self.find_vehicle(&plate).await?;
        if vehicle.retired {
            return Err(FleetError::not_found(EntityKind::Vehicle, plate));
        }
        if let Some(status) = update.status {
            ensure_usage_transition(&plate, vehicle.status, status)?;
            vehicle.status = status;
        }
        if let Some(level) = update.battery_level {
            vehicle.battery_level = level;
        }
        vehicle.updated_at_ms = self.now_ms();
        self.commit_vehicle(ctx, vehicle.clone()).await?;
        Ok(vehicle)
    }
}

/// 借出 / 归还必须走用车流程，保证用车记录与车辆状态一致。
fn ensure_usage_transition(
    plate: &str,
    from: VehicleStatus,
    to: VehicleStatus,
) -> Result<(), FleetError> {
    let touches_in_use = from == VehicleStatus::InUse || to == VehicleStatus::InUse;
    if touches_in_use && from != to {
        return Err(FleetError::conflict(format!(
            "vehicle {plate} in-use status changes only through checkout and check-in"
        )));
    }
    Ok(())
}
