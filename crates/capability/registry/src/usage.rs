//! 借出与归还
//!
//! 借出：车辆可用、用户存在且启用 → 新建进行中的用车记录，车辆转为使用中。
//! 归还：关闭用车记录（结束 ≥ 开始），车辆回到可用，可同时更新位置与电量。

use crate::{Registry, vehicle_index_op};
use domain::{
    EntityKind, EntityRef, FleetError, RequestContext, RouteSummary, UsageMetrics, UsageRecord,
    UsageStatus, Vehicle, VehicleLocation, VehicleStatus,
};
use fleet_storage::{validate_usage_close, validate_vehicle};
use tracing::info;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub plate: String,
    pub user_id: String,
    pub origin: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckinRequest {
    /// 缺省为当前时间。
    pub ended_at_ms: Option<i64>,
    pub destination: Option<String>,
    pub distance_km: Option<f64>,
    pub location: Option<VehicleLocation>,
    pub battery_level: Option<u8>,
    pub metrics: Option<UsageMetrics>,
    pub notes: Option<String>,
}

impl Registry {
    pub async fn checkout(
        &self,
        ctx: &RequestContext,
        request: CheckoutRequest,
    ) -> Result<UsageRecord, FleetError> {
        let plate = Vehicle::normalize_plate(&request.plate);
        let _locks = self
            .locks()
            .acquire_many(
                ctx,
                &[
                    EntityRef::vehicle(plate.clone()),
                    EntityRef::new(EntityKind::User, request.user_id.clone()),
                ],
            )
            .await?;
        let mut vehicle = self.find_vehicle(&plate).await?;
        if vehicle.retired {
            return Err(FleetError::not_found(EntityKind::Vehicle, plate));
        }
        if !vehicle.is_available() {
            return Err(FleetError::conflict(format!(
                "vehicle {plate} is not available ({})",
                vehicle.status.as_str()
            )));
        }
        let user = self
            .stores()
            .users
            .find_user(&request.user_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::User, request.user_id.clone()))?;
        if !user.active {
            return Err(FleetError::conflict(format!(
                "user {} is inactive",
                user.person_id
            )));
        }

        let now = self.now_ms();
        let record = UsageRecord {
            usage_id: self.ids().usage_id(),
            vehicle_plate: plate.clone(),
            vehicle_model: vehicle.model.clone(),
            user_id: user.person_id.clone(),
            user_name: user.name.clone(),
            started_at_ms: now,
            ended_at_ms: None,
            duration_minutes: None,
            route: RouteSummary {
                origin: request.origin,
                destination: None,
                distance_km: None,
            },
            status: UsageStatus::InProgress,
            metrics: None,
            notes: request.notes,
        };
        vehicle.status = VehicleStatus::InUse;
        vehicle.current_user = Some(user.person_id.clone());
        vehicle.updated_at_ms = now;

        // 两次写入之前完成全部校验。
        validate_vehicle(&vehicle)?;
        let _gate = self.write_gate(ctx).await?;
        let record = self.stores().usage.create_usage(record).await?;
        let op = vehicle_index_op(&vehicle);
        self.stores().vehicles.upsert_vehicle(vehicle).await?;
        self.reindex(op)?;
        info!(
            target: "fleet.registry",
            usage_id = %record.usage_id,
            plate = %plate,
            user_id = %record.user_id,
            "vehicle_checked_out"
        );
        Ok(record)
    }

    pub async fn checkin(
        &self,
        ctx: &RequestContext,
        usage_id: &str,
        request: CheckinRequest,
    ) -> Result<UsageRecord, FleetError> {
        let plate = self
            .stores()
            .usage
            .find_usage(usage_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Usage, usage_id))?
            .vehicle_plate;
        let _locks = self
            .locks()
            .acquire_many(
                ctx,
                &[
                    EntityRef::new(EntityKind::Usage, usage_id),
                    EntityRef::vehicle(plate.clone()),
                ],
            )
            .await?;
        // 加锁后重新读取，避免与并发归还交错。
        let mut record = self
            .stores()
            .usage
            .find_usage(usage_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Usage, usage_id))?;
        if record.is_finished() {
            return Err(FleetError::conflict(format!(
                "usage {usage_id} already finished"
            )));
        }
        let ended = request.ended_at_ms.unwrap_or_else(|| self.now_ms());
        if ended < record.started_at_ms {
            return Err(FleetError::validation(format!(
                "usage {usage_id} cannot end before it starts"
            )));
        }
        if let Some(distance) = request.distance_km
            && !(distance.is_finite() && distance >= 0.0)
        {
            return Err(FleetError::validation("distance must be non-negative"));
        }

        let mut vehicle = self.find_vehicle(&plate).await?;
        if let Some(location) = request.location {
            self.ensure_zone(&location.zone).await?;
            if let Some(point) = &location.point {
                point.validate()?;
            }
            vehicle.location = location;
        }
        if let Some(level) = request.battery_level {
            vehicle.battery_level = level;
        }
        vehicle.status = VehicleStatus::Available;
        vehicle.current_user = None;
        vehicle.updated_at_ms = self.now_ms();

        record.ended_at_ms = Some(ended);
        record.duration_minutes = Some((ended - record.started_at_ms) / 60_000);
        record.route.destination = request.destination;
        record.route.distance_km = request.distance_km;
        record.metrics = request.metrics;
        if request.notes.is_some() {
            record.notes = request.notes;
        }
        record.status = UsageStatus::Finished;

        validate_vehicle(&vehicle)?;
        validate_usage_close(&record)?;
        let _gate = self.write_gate(ctx).await?;
        let closed = self.stores().usage.close_usage(record).await?;
        let op = vehicle_index_op(&vehicle);
        self.stores().vehicles.upsert_vehicle(vehicle).await?;
        self.reindex(op)?;
        info!(
            target: "fleet.registry",
            usage_id,
            plate = %plate,
            duration_minutes = closed.duration_minutes.unwrap_or_default(),
            "vehicle_checked_in"
        );
        Ok(closed)
    }

    pub async fn get_usage(&self, ctx: &RequestContext, usage_id: &str) -> Result<UsageRecord, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.stores()
            .usage
            .find_usage(usage_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Usage, usage_id))
    }

    pub async fn usage_history(
        &self,
        ctx: &RequestContext,
        plate: &str,
    ) -> Result<Vec<UsageRecord>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.stores()
            .usage
            .list_usage_by_vehicle(&Vehicle::normalize_plate(plate))
            .await
    }
}
