//! 位置索引全量重建（拷贝后替换）。

use crate::{Registry, device_index_op, vehicle_index_op};
use domain::{FleetError, RequestContext};
use fleet_geo::{GeoIndex, IndexOp};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 单次重建结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub entries: usize,
    pub replayed: usize,
}

impl Registry {
    /// 从存储快照重建位置索引。
    ///
    /// 先打开重建日志再读快照，快照之后的写入经日志回放，替换后的索引
    /// 与存储一致。
    pub async fn rebuild_index(&self, ctx: &RequestContext) -> Result<RebuildReport, FleetError> {
        let index = self.location_index();
        index.begin_rebuild()?;
        let (vehicles, devices) = {
            let _gate = match self.read_gate(ctx).await {
                Ok(gate) => gate,
                Err(err) => {
                    index.abort_rebuild();
                    return Err(err);
                }
            };
            let vehicles = self.stores().vehicles.list_vehicles().await;
            let devices = self.stores().devices.list_devices().await;
            match (vehicles, devices) {
                (Ok(vehicles), Ok(devices)) => (vehicles, devices),
                (Err(err), _) | (_, Err(err)) => {
                    index.abort_rebuild();
                    return Err(err);
                }
            }
        };

        let mut fresh = GeoIndex::new();
        let ops = vehicles
            .iter()
            .map(vehicle_index_op)
            .chain(devices.iter().map(device_index_op));
        for op in ops {
            if let IndexOp::Upsert(entity, placement) = op {
                fresh.upsert(entity, placement);
            }
        }
        let entries = fresh.len();
        let replayed = index.finish_rebuild(fresh)?;
        self.locks().prune();
        fleet_telemetry::record_index_rebuild();
        info!(target: "fleet.registry", entries, replayed, "index_rebuilt");
        Ok(RebuildReport { entries, replayed })
    }
}

/// 周期性后台重建。`interval` 为零时不启动。
pub fn spawn_index_rebuild(registry: Arc<Registry>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // 首个 tick 立即返回，跳过。
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = registry.rebuild_index(&RequestContext::system()).await {
                warn!(target: "fleet.registry", error = %err, "index_rebuild_failed");
            }
        }
    }))
}
