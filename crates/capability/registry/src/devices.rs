//! 设备登记：写入、心跳、状态、位置与退役。

use crate::locks::EntityGuard;
use crate::{Registry, device_index_op};
use domain::{
    Device, DeviceLocation, DeviceStatus, EntityKind, EntityRef, FleetError, RequestContext,
};
use fleet_storage::UpsertOutcome;
use tracing::info;

impl Registry {
    /// 写入设备并刷新位置索引。保留已有的创建时间与最后通讯时间；
    /// 新设备未给出最后通讯时间时以登记时刻计。已退役的设备不可再写入。
    pub async fn upsert_device(
        &self,
        ctx: &RequestContext,
        mut device: Device,
    ) -> Result<UpsertOutcome, FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::device(device.device_id.clone()))
            .await?;
        self.ensure_zone(&device.location.zone).await?;
        let now = self.now_ms();
        match self.stores().devices.find_device(&device.device_id).await? {
            Some(existing) => {
                if existing.retired {
                    return Err(FleetError::conflict(format!(
                        "device {} is retired",
                        existing.device_id
                    )));
                }
                device.retired = false;
                device.created_at_ms = existing.created_at_ms;
                device.last_communication_ms =
                    device.last_communication_ms.max(existing.last_communication_ms);
                device.updated_at_ms = existing.updated_at_ms;
                if existing == device {
                    return Ok(UpsertOutcome::Unchanged);
                }
            }
            None => {
                device.created_at_ms = now;
                device.last_communication_ms.get_or_insert(now);
            }
        }
        device.updated_at_ms = now;
        self.commit_device(ctx, device).await
    }

    async fn commit_device(
        &self,
        ctx: &RequestContext,
        device: Device,
    ) -> Result<UpsertOutcome, FleetError> {
        let _gate = self.write_gate(ctx).await?;
        let op = device_index_op(&device);
        let device_id = device.device_id.clone();
        let outcome = self.stores().devices.upsert_device(device).await?;
        self.reindex(op)?;
        info!(
            target: "fleet.registry",
            device_id = %device_id,
            outcome = ?outcome,
            "device_committed"
        );
        Ok(outcome)
    }

    pub async fn get_device(&self, ctx: &RequestContext, device_id: &str) -> Result<Device, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        self.find_device(device_id).await
    }

    pub(crate) async fn find_device(&self, device_id: &str) -> Result<Device, FleetError> {
        self.stores()
            .devices
            .find_device(device_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Device, device_id))
    }

    pub async fn list_devices(
        &self,
        ctx: &RequestContext,
        include_retired: bool,
    ) -> Result<Vec<Device>, FleetError> {
        let _gate = self.read_gate(ctx).await?;
        let devices = self.stores().devices.list_devices().await?;
        Ok(devices
            .into_iter()
            .filter(|item| include_retired || !item.retired)
            .collect())
    }

    /// 软删除：打退役标记并从位置索引移除。
    pub async fn retire_device(&self, ctx: &RequestContext, device_id: &str) -> Result<Device, FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::device(device_id))
            .await?;
        let mut device = self.find_device(device_id).await?;
        if device.retired {
            return Ok(device);
        }
        device.retired = true;
        device.status = DeviceStatus::Offline;
        device.updated_at_ms = self.now_ms();
        self.commit_device(ctx, device.clone()).await?;
        info!(target: "fleet.registry", device_id, "device_retired");
        Ok(device)
    }

    /// 记录心跳（自行加锁）。
    pub async fn record_heartbeat(
        &self,
        ctx: &RequestContext,
        device_id: &str,
        at_ms: i64,
    ) -> Result<Device, FleetError> {
        let guard = self
            .locks()
            .acquire(ctx, &EntityRef::device(device_id))
            .await?;
        self.record_heartbeat_held(ctx, &guard, device_id, at_ms).await
    }

    /// 记录心跳：标记在线并推进最后通讯时间。调用方已持有设备锁。
    pub async fn record_heartbeat_held(
        &self,
        ctx: &RequestContext,
        guard: &EntityGuard,
        device_id: &str,
        at_ms: i64,
    ) -> Result<Device, FleetError> {
        guard.ensure_holds(&EntityRef::device(device_id))?;
        let mut device = self.find_device(device_id).await?;
        if device.retired {
            return Err(FleetError::UnknownDevice(device_id.to_string()));
        }
        let last = device.last_communication_ms.max(Some(at_ms));
        // 维护 / 故障状态需要人工恢复，心跳不覆盖。
        let status = match device.status {
            DeviceStatus::Offline => DeviceStatus::Online,
            other => other,
        };
        if last == device.last_communication_ms && status == device.status {
            return Ok(device);
        }
        device.last_communication_ms = last;
        device.status = status;
        device.updated_at_ms = self.now_ms();
        self.commit_device(ctx, device.clone()).await?;
        Ok(device)
    }

    pub async fn set_device_status(
        &self,
        ctx: &RequestContext,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Device, FleetError> {
        let guard = self
            .locks()
            .acquire(ctx, &EntityRef::device(device_id))
            .await?;
        self.set_device_status_held(ctx, &guard, device_id, status).await
    }

    /// 调用方已持有设备锁。
    pub async fn set_device_status_held(
        &self,
        ctx: &RequestContext,
        guard: &EntityGuard,
        device_id: &str,
        status: DeviceStatus,
    ) -> Result<Device, FleetError> {
        guard.ensure_holds(&EntityRef::device(device_id))?;
        let mut device = self.find_device(device_id).await?;
        if device.retired {
            return Err(FleetError::not_found(EntityKind::Device, device_id));
        }
        if device.status == status {
            return Ok(device);
        }
        let previous = device.status;
        device.status = status;
        device.updated_at_ms = self.now_ms();
        self.commit_device(ctx, device.clone()).await?;
        info!(
            target: "fleet.registry",
            device_id,
            from = previous.as_str(),
            to = status.as_str(),
            "device_status_changed"
        );
        Ok(device)
    }

    pub async fn update_device_location(
        &self,
        ctx: &RequestContext,
        device_id: &str,
        location: DeviceLocation,
    ) -> Result<Device, FleetError> {
        let _lock = self
            .locks()
            .acquire(ctx, &EntityRef::device(device_id))
            .await?;
        let mut device = self.find_device(device_id).await?;
        if device.retired {
            return Err(FleetError::not_found(EntityKind::Device, device_id));
        }
        self.ensure_zone(&location.zone).await?;
        if let Some(point) = &location.point {
            point.validate()?;
        }
        device.location = location;
        device.updated_at_ms = self.now_ms();
        self.commit_device(ctx, device.clone()).await?;
        Ok(device)
    }
}
