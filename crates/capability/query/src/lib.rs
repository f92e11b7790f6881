//! 查询服务
//!
//! 只读视图：分区可用车辆、活动告警、离线设备、位置查询、设备状态与车队概览。
//! 每个查询只在复制所需数据期间持有注册表的可见性闸门（读侧）。

use domain::{
    Alert, Device, DeviceStatus, EntityKind, EntityRef, FleetError, GeoPoint, RequestContext,
    SensorReading, UsageRecord, Vehicle, VehicleStatus,
};
use fleet_alert::AlertEngine;
use fleet_geo::NearbyHit;
use fleet_registry::Registry;
use fleet_storage::AlertQuery;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_READING_LIMIT: usize = 20;

/// 设备状态视图：设备本身、最新读数与活动告警数。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatusView {
    pub device: Device,
    pub latest_reading: Option<SensorReading>,
    pub active_alerts: usize,
    pub silent_minutes: Option<i64>,
}

/// 车队概览（不含已退役车辆）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub maintenance: usize,
    pub reserved: usize,
    pub low_battery: usize,
    pub critical_battery: usize,
    pub average_battery: f64,
    pub devices_online: usize,
    pub devices_offline: usize,
    pub active_alerts: usize,
}

#[derive(Clone)]
pub struct QueryService {
    registry: Arc<Registry>,
    engine: Arc<AlertEngine>,
}

impl QueryService {
    pub fn new(engine: Arc<AlertEngine>) -> Self {
        Self {
            registry: engine.registry().clone(),
            engine,
        }
    }

    /// 分区内当前可用的车辆，按车牌排序。
    pub async fn vehicles_available_in_zone(
        &self,
        ctx: &RequestContext,
        zone: &str,
    ) -> Result<Vec<Vehicle>, FleetError> {
        let _gate = self.registry.read_gate(ctx).await?;
        if self.registry.stores().zones.find_zone(zone).await?.is_none() {
            return Err(FleetError::not_found(EntityKind::Zone, zone));
        }
        let mut vehicles = Vec::new();
        for entity in self.registry.location_index().by_zone(zone)? {
            if entity.kind != EntityKind::Vehicle {
                continue;
            }
            if let Some(vehicle) = self.registry.stores().vehicles.find_vehicle(&entity.id).await?
                && vehicle.is_available()
            {
                vehicles.push(vehicle);
            }
        }
        vehicles.sort_by(|a, b| a.plate.cmp(&b.plate));
        debug!(target: "fleet.query", zone, count = vehicles.len(), "available_vehicles_listed");
        Ok(vehicles)
    }

    /// 活动告警：严重度降序，其次创建时间降序。
    pub async fn active_alerts(
        &self,
        ctx: &RequestContext,
        filter: AlertQuery,
    ) -> Result<Vec<Alert>, FleetError> {
        self.engine.list_active(ctx, filter).await
    }

    pub async fn offline_devices(&self, ctx: &RequestContext) -> Result<Vec<Device>, FleetError> {
        let mut devices: Vec<Device> = self
            .registry
            .list_devices(ctx, false)
            .await?
            .into_iter()
            .filter(|device| device.status == DeviceStatus::Offline)
            .collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    pub async fn by_zone(
        &self,
        ctx: &RequestContext,
        zone: &str,
    ) -> Result<Vec<EntityRef>, FleetError> {
        self.registry.by_zone(ctx, zone).await
    }

    pub async fn nearby(
        &self,
        ctx: &RequestContext,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<NearbyHit>, FleetError> {
        let center = GeoPoint::new(latitude, longitude);
        let hits = self.registry.nearby(ctx, &center, radius_m).await?;
        debug!(target: "fleet.query", radius_m, count = hits.len(), "nearby_listed");
        Ok(hits)
    }

    pub async fn vehicle(&self, ctx: &RequestContext, plate: &str) -> Result<Vehicle, FleetError> {
        self.registry.get_vehicle(ctx, plate).await
    }

    pub async fn device_status(
        &self,
        ctx: &RequestContext,
        device_id: &str,
    ) -> Result<DeviceStatusView, FleetError> {
        let _gate = self.registry.read_gate(ctx).await?;
        let stores = self.registry.stores();
        let device = stores
            .devices
            .find_device(device_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Device, device_id))?;
        let latest_reading = stores
            .readings
            .list_readings(device_id, 1)
            .await?
            .into_iter()
            .next();
        let active_alerts = stores
            .alerts
            .list_alerts(&AlertQuery {
                device_id: Some(device_id.to_string()),
                ..AlertQuery::active()
            })
            .await?
            .len();
        let now = self.registry.now_ms();
        let silent_minutes = device
            .last_communication_ms
            .map(|last| ((now - last) / 60_000).max(0));
        Ok(DeviceStatusView {
            device,
            latest_reading,
            active_alerts,
            silent_minutes,
        })
    }

    /// 设备最近的读数（源时间戳降序）。
    pub async fn recent_readings(
        &self,
        ctx: &RequestContext,
        device_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SensorReading>, FleetError> {
        let _gate = self.registry.read_gate(ctx).await?;
        let stores = self.registry.stores();
        if stores.devices.find_device(device_id).await?.is_none() {
            return Err(FleetError::not_found(EntityKind::Device, device_id));
        }
        stores
            .readings
            .list_readings(device_id, limit.unwrap_or(DEFAULT_READING_LIMIT))
            .await
    }

    pub async fn usage_history(
        &self,
        ctx: &RequestContext,
        plate: &str,
    ) -> Result<Vec<UsageRecord>, FleetError> {
        self.registry.usage_history(ctx, plate).await
    }

    pub async fn fleet_summary(&self, ctx: &RequestContext) -> Result<FleetSummary, FleetError> {
        let (vehicles, devices, active_alerts) = {
            let _gate = self.registry.read_gate(ctx).await?;
            let stores = self.registry.stores();
            (
                stores.vehicles.list_vehicles().await?,
                stores.devices.list_devices().await?,
                stores.alerts.list_alerts(&AlertQuery::active()).await?.len(),
            )
        };
        let vehicles: Vec<&Vehicle> = vehicles.iter().filter(|item| !item.retired).collect();
        let count_status = |status: VehicleStatus| {
            vehicles
                .iter()
                .filter(|vehicle| vehicle.status == status)
                .count()
        };
        let total = vehicles.len();
        let battery_sum: u64 = vehicles
            .iter()
            .map(|vehicle| u64::from(vehicle.battery_level))
            .sum();
        let average_battery = if total == 0 {
            0.0
        } else {
            battery_sum as f64 / total as f64
        };
        let devices: Vec<&Device> = devices.iter().filter(|item| !item.retired).collect();
        Ok(FleetSummary {
            total,
            available: count_status(VehicleStatus::Available),
            in_use: count_status(VehicleStatus::InUse),
            maintenance: count_status(VehicleStatus::Maintenance),
            reserved: count_status(VehicleStatus::Reserved),
            low_battery: vehicles.iter().filter(|item| item.is_battery_low()).count(),
            critical_battery: vehicles
                .iter()
                .filter(|item| item.is_battery_critical())
                .count(),
            average_battery,
            devices_online: devices
                .iter()
                .filter(|item| item.status == DeviceStatus::Online)
                .count(),
            devices_offline: devices
                .iter()
                .filter(|item| item.status == DeviceStatus::Offline)
                .count(),
            active_alerts,
        })
    }
}
