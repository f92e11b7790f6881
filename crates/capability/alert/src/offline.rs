//! 离线巡检
//!
//! 周期扫描最后通讯时间超过阈值的设备：标记为离线，并在冷却允许时
//! 产生一条 HIGH 级系统告警。维护中的设备不参与巡检。

use crate::engine::AlertEngine;
use domain::{
    AlertCategory, AlertOrigin, DeviceStatus, EntityRef, FleetError, RequestContext, Severity,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const OFFLINE_ALERT_TITLE: &str = "Device offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflinePolicy {
    pub threshold_ms: i64,
    pub alert_cooldown_ms: i64,
}

/// 单次巡检结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineSweep {
    pub checked: usize,
    pub marked_offline: Vec<String>,
    pub alert_ids: Vec<String>,
}

pub struct OfflineMonitor {
    engine: Arc<AlertEngine>,
    policy: OfflinePolicy,
}

impl OfflineMonitor {
    pub fn new(engine: Arc<AlertEngine>, policy: OfflinePolicy) -> Self {
        Self { engine, policy }
    }

    pub async fn sweep(&self, ctx: &RequestContext) -> Result<OfflineSweep, FleetError> {
        let registry = self.engine.registry();
        let now = registry.now_ms();
        let candidates: Vec<String> = registry
            .list_devices(ctx, false)
            .await?
            .into_iter()
            .filter(|device| device.status != DeviceStatus::Maintenance)
            .filter(|device| device.is_silent(now, self.policy.threshold_ms))
            .map(|device| device.device_id)
            .collect();

        let mut sweep = OfflineSweep {
            checked: candidates.len(),
            ..OfflineSweep::default()
        };
        for device_id in candidates {
            match self.handle_silent(ctx, &device_id, now, &mut sweep).await {
                Ok(()) => {}
                Err(FleetError::Contention { .. }) => {
                    warn!(target: "fleet.alert", device_id = %device_id, "offline_check_skipped");
                }
                Err(err) => return Err(err),
            }
        }
        if !sweep.marked_offline.is_empty() || !sweep.alert_ids.is_empty() {
            info!(
                target: "fleet.alert",
                checked = sweep.checked,
                marked = sweep.marked_offline.len(),
                alerts = sweep.alert_ids.len(),
                "offline_sweep_completed"
            );
        }
        Ok(sweep)
    }

    async fn handle_silent(
        &self,
        ctx: &RequestContext,
        device_id: &str,
        now: i64,
        sweep: &mut OfflineSweep,
    ) -> Result<(), FleetError> {
        let registry = self.engine.registry();
        let guard = registry
            .locks()
            .acquire(ctx, &EntityRef::device(device_id))
            .await?;
        // 加锁后重读：等待期间可能已收到心跳。
        let device = registry.get_device(ctx, device_id).await?;
        if device.retired
            || device.status == DeviceStatus::Maintenance
            || !device.is_silent(now, self.policy.threshold_ms)
        {
            return Ok(());
        }
        let device = if device.status != DeviceStatus::Offline {
            let device = registry
                .set_device_status_held(ctx, &guard, device_id, DeviceStatus::Offline)
                .await?;
            fleet_telemetry::record_device_marked_offline();
            sweep.marked_offline.push(device_id.to_string());
            device
        } else {
            device
        };

        if !self
            .engine
            .cooldown_allows(
                device_id,
                AlertCategory::System,
                AlertOrigin::Monitor,
                now,
                self.policy.alert_cooldown_ms,
            )
            .await?
        {
            fleet_telemetry::record_alert_suppressed();
            return Ok(());
        }
        let silent_minutes = (now - device.silent_since_ms()) / 60_000;
        let description = match device.last_communication_ms {
            Some(_) => {
                format!("Device {device_id} has not communicated for {silent_minutes} minutes")
            }
            None => format!(
                "Device {device_id} has not communicated since registration {silent_minutes} minutes ago"
            ),
        };
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "last_communication_ms".to_string(),
            json!(device.last_communication_ms),
        );
        metadata.insert("silent_minutes".to_string(), json!(silent_minutes));
        let alert = self.engine.system_alert(
            &device,
            Severity::High,
            OFFLINE_ALERT_TITLE,
            description,
            now,
            metadata,
        );
        let alert = self.engine.insert_alert(ctx, alert).await?;
        sweep.alert_ids.push(alert.alert_id);
        Ok(())
    }
}

/// 周期巡检。`interval` 为零时不启动。
pub fn spawn_offline_monitor(
    monitor: Arc<OfflineMonitor>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = monitor.sweep(&RequestContext::system()).await {
                warn!(target: "fleet.alert", error = %err, "offline_sweep_failed");
            }
        }
    }))
}
