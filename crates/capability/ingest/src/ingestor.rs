//! 读数接入
//!
//! 一次接入：校验 → 设备锁 → 去重 → 规则求值 → 原子提交（读数 + 事件 + 告警）
//! → 刷新设备心跳。提交前任何失败都不会留下记录。

use domain::{EntityRef, FleetError, IotEvent, RequestContext, SensorReading};
use fleet_alert::AlertEngine;
use fleet_registry::Registry;
use fleet_storage::IngestCommit;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// 未上报事件类型、但有规则命中时使用的事件类型。
pub const RULE_MATCH_EVENT: &str = "rule_match";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub device_id: String,
    pub reading_type: String,
    pub value: f64,
    pub unit: String,
    /// 源时间戳（毫秒）。
    pub ts_ms: i64,
    pub raw_payload: Value,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub reading_id: String,
    pub event_id: Option<String>,
    pub alert_ids: Vec<String>,
    /// 重复上报，返回的是首次接入的读数。
    pub duplicate: bool,
}

impl IngestReceipt {
    fn duplicate_of(reading: &SensorReading) -> Self {
        Self {
            reading_id: reading.reading_id.clone(),
            event_id: None,
            alert_ids: reading.alert_ids.clone(),
            duplicate: true,
        }
    }
}

#[derive(Clone)]
pub struct Ingestor {
    engine: Arc<AlertEngine>,
}

impl Ingestor {
    pub fn new(engine: Arc<AlertEngine>) -> Self {
        Self { engine }
    }

    fn registry(&self) -> &Registry {
        self.engine.registry()
    }

    pub async fn ingest(
        &self,
        ctx: &RequestContext,
        request: IngestRequest,
    ) -> Result<IngestReceipt, FleetError> {
        let started = Instant::now();
        let device_id = request.device_id.clone();
        let result = self.ingest_inner(ctx, request).await;
        match &result {
            Ok(receipt) if receipt.duplicate => {
                fleet_telemetry::record_reading_duplicate();
                info!(
                    target: "fleet.ingest",
                    device_id = %device_id,
                    reading_id = %receipt.reading_id,
                    "reading_duplicate"
                );
            }
            Ok(receipt) => {
                let elapsed = started.elapsed().as_millis() as u64;
                fleet_telemetry::record_reading_ingested();
                fleet_telemetry::record_ingest_latency_ms(elapsed);
                info!(
                    target: "fleet.ingest",
                    device_id = %device_id,
                    reading_id = %receipt.reading_id,
                    alerts = receipt.alert_ids.len(),
                    elapsed_ms = elapsed,
                    "reading_ingested"
                );
            }
            Err(FleetError::DeadlineExceeded) => {
                fleet_telemetry::record_deadline_exceeded();
                warn!(target: "fleet.ingest", device_id = %device_id, "ingest_deadline_exceeded");
            }
            Err(err) => {
                fleet_telemetry::record_reading_rejected();
                warn!(
                    target: "fleet.ingest",
                    device_id = %device_id,
                    code = err.code(),
                    error = %err,
                    "reading_rejected"
                );
            }
        }
        result
    }

    async fn ingest_inner(
        &self,
        ctx: &RequestContext,
        request: IngestRequest,
    ) -> Result<IngestReceipt, FleetError> {
        validate_request(&request)?;
        ctx.ensure_live()?;
        let registry = self.registry();
        let guard = registry
            .locks()
            .acquire(ctx, &EntityRef::device(request.device_id.clone()))
            .await?;

        let device = match registry.get_device(ctx, &request.device_id).await {
            Ok(device) if !device.retired => device,
            Ok(_) | Err(FleetError::NotFound { .. }) => {
                return Err(FleetError::UnknownDevice(request.device_id));
            }
            Err(err) => return Err(err),
        };

        let readings = &registry.stores().readings;
        if let Some(existing) = readings
            .find_reading_by_key(&request.device_id, request.ts_ms)
            .await?
        {
            if existing.same_content(request.value, &request.raw_payload) {
                return Ok(IngestReceipt::duplicate_of(&existing));
            }
            return Err(FleetError::conflict(format!(
                "reading for {} at {} already exists with different content",
                request.device_id, request.ts_ms
            )));
        }

        let now = registry.now_ms();
        let mut reading = SensorReading {
            reading_id: registry.ids().reading_id(),
            device_id: request.device_id.clone(),
            device_type: device.device_type,
            reading_type: request.reading_type,
            value: request.value,
            unit: request.unit,
            ts_ms: request.ts_ms,
            received_at_ms: now,
            raw_payload: request.raw_payload,
            processed: true,
            alert_ids: Vec::new(),
        };
        let mut alerts = self
            .engine
            .evaluate(&device, &reading, request.event_type.as_deref())
            .await?;

        let event = if request.event_type.is_some() || !alerts.is_empty() {
            let event_id = registry.ids().event_id(reading.ts_ms);
            for alert in &mut alerts {
                alert.event_id = Some(event_id.clone());
            }
            Some(IotEvent {
                event_id,
                event_type: request
                    .event_type
                    .unwrap_or_else(|| RULE_MATCH_EVENT.to_string()),
                ts_ms: reading.ts_ms,
                device_id: reading.device_id.clone(),
                payload: reading.raw_payload.clone(),
                reading_id: reading.reading_id.clone(),
                alert_id: alerts.first().map(|alert| alert.alert_id.clone()),
                processed: true,
            })
        } else {
            None
        };
        reading.alert_ids = alerts.iter().map(|alert| alert.alert_id.clone()).collect();

        let receipt = IngestReceipt {
            reading_id: reading.reading_id.clone(),
            event_id: event.as_ref().map(|event| event.event_id.clone()),
            alert_ids: reading.alert_ids.clone(),
            duplicate: false,
        };
        let alert_count = alerts.len();
        let has_event = event.is_some();
        {
            let _gate = registry.write_gate(ctx).await?;
            match readings
                .commit_ingest(IngestCommit {
                    reading,
                    event,
                    alerts,
                })
                .await
            {
                Ok(()) => {}
                Err(FleetError::DuplicateReading { reading_id }) => {
                    let existing = readings.find_reading(&reading_id).await?.ok_or_else(|| {
                        FleetError::Backend(format!("duplicate reading {reading_id} vanished"))
                    })?;
                    return Ok(IngestReceipt::duplicate_of(&existing));
                }
                Err(err) => return Err(err),
            }
        }
        for _ in 0..alert_count {
            fleet_telemetry::record_alert_created();
        }
        if has_event {
            fleet_telemetry::record_event_recorded();
        }
        for alert_id in &receipt.alert_ids {
            info!(
                target: "fleet.ingest",
                device_id = %device.device_id,
                alert_id = %alert_id,
                "alert_created"
            );
        }

        // 读数已提交；心跳失败只记录，不影响本次接入结果。
        if let Err(err) = registry
            .record_heartbeat_held(&RequestContext::system(), &guard, &device.device_id, now)
            .await
        {
            warn!(
                target: "fleet.ingest",
                device_id = %device.device_id,
                error = %err,
                "heartbeat_update_failed"
            );
        }
        Ok(receipt)
    }
}

fn validate_request(request: &IngestRequest) -> Result<(), FleetError> {
    if request.device_id.trim().is_empty() {
        return Err(FleetError::validation("device id is required"));
    }
    if request.reading_type.trim().is_empty() {
        return Err(FleetError::validation("reading type is required"));
    }
    if !request.value.is_finite() {
        return Err(FleetError::validation("reading value must be finite"));
    }
    if request.ts_ms <= 0 {
        return Err(FleetError::validation("timestamp must be positive"));
    }
    Ok(())
}
