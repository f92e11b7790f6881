//! 事件账本内存实现
//!
//! 读数、事件与告警共用一把锁：一次接入的所有记录在同一个写锁内校验并落盘，
//! 校验失败时不写入任何内容。读数与事件只追加；告警只允许从活动转为已解决。

use crate::models::{AlertQuery, IngestCommit};
use crate::traits::{AlertStore, ReadingStore};
use domain::{Alert, AlertCategory, AlertOrigin, EntityKind, FleetError, IotEvent, SensorReading};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    readings: Vec<SensorReading>,
    reading_index: HashMap<String, usize>,
    dedup: HashMap<(String, i64), usize>,
    events: Vec<IotEvent>,
    event_index: HashMap<String, usize>,
    alerts: Vec<Alert>,
    alert_index: HashMap<String, usize>,
    last_alert: HashMap<(String, AlertCategory, AlertOrigin), i64>,
}

impl LedgerState {
    fn check_alert_ids<'a>(
        &self,
        alerts: impl Iterator<Item = &'a Alert>,
    ) -> Result<(), FleetError> {
        let mut seen = Vec::new();
        for alert in alerts {
            if self.alert_index.contains_key(&alert.alert_id) || seen.contains(&&alert.alert_id) {
                return Err(FleetError::conflict(format!(
                    "alert {} exists",
                    alert.alert_id
                )));
            }
            seen.push(&alert.alert_id);
        }
        Ok(())
    }

    fn push_alert(&mut self, alert: Alert) {
        if let Some(device_id) = alert.device_id.clone() {
            let entry = self
                .last_alert
                .entry((device_id, alert.category, alert.origin()))
                .or_insert(alert.source_ts_ms);
            *entry = (*entry).max(alert.source_ts_ms);
        }
        self.alert_index
            .insert(alert.alert_id.clone(), self.alerts.len());
        self.alerts.push(alert);
    }
}

/// 读数 / 事件 / 告警内存账本
#[derive(Default)]
pub struct InMemoryEventLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryEventLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryEventLedger {
    async fn find_reading(&self, reading_id: &str) -> Result<Option<SensorReading>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .reading_index
            .get(reading_id)
            .map(|index| state.readings[*index].clone()))
    }

    async fn find_reading_by_key(
        &self,
        device_id: &str,
        ts_ms: i64,
    ) -> Result<Option<SensorReading>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .dedup
            .get(&(device_id.to_string(), ts_ms))
            .map(|index| state.readings[*index].clone()))
    }

    async fn list_readings(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        let mut items: Vec<SensorReading> = state
            .readings
            .iter()
            .filter(|item| item.device_id == device_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        items.truncate(limit);
        Ok(items)
    }

    async fn count_readings(&self) -> Result<usize, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state.readings.len())
    }

    async fn find_event(&self, event_id: &str) -> Result<Option<IotEvent>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .event_index
            .get(event_id)
            .map(|index| state.events[*index].clone()))
    }

    async fn list_events(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<IotEvent>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        let mut items: Vec<IotEvent> = state
            .events
            .iter()
            .filter(|item| item.device_id == device_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.ts_ms.cmp(&a.ts_ms));
        items.truncate(limit);
        Ok(items)
    }

    async fn commit_ingest(&self, commit: IngestCommit) -> Result<(), FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        let IngestCommit {
            reading,
            event,
            alerts,
        } = commit;

        let key = (reading.device_id.clone(), reading.ts_ms);
        if let Some(index) = state.dedup.get(&key) {
            return Err(FleetError::DuplicateReading {
                reading_id: state.readings[*index].reading_id.clone(),
            });
        }
        if state.reading_index.contains_key(&reading.reading_id) {
            return Err(FleetError::conflict(format!(
                "reading {} exists",
                reading.reading_id
            )));
        }
        if let Some(event) = &event
            && state.event_index.contains_key(&event.event_id)
        {
            return Err(FleetError::conflict(format!(
                "event {} exists",
                event.event_id
            )));
        }
        state.check_alert_ids(alerts.iter())?;

        let position = state.readings.len();
        state
            .reading_index
            .insert(reading.reading_id.clone(), position);
        state.dedup.insert(key, position);
        state.readings.push(reading);
        if let Some(event) = event {
            let position = state.events.len();
            state.event_index.insert(event.event_id.clone(), position);
            state.events.push(event);
        }
        for alert in alerts {
            state.push_alert(alert);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AlertStore for InMemoryEventLedger {
    async fn insert_alert(&self, alert: Alert) -> Result<(), FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        state.check_alert_ids(std::iter::once(&alert))?;
        state.push_alert(alert);
        Ok(())
    }

    async fn find_alert(&self, alert_id: &str) -> Result<Option<Alert>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .alert_index
            .get(alert_id)
            .map(|index| state.alerts[*index].clone()))
    }

    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .alerts
            .iter()
            .filter(|alert| query.matches(alert))
            .cloned()
            .collect())
    }

    async fn last_alert_ts(
        &self,
        device_id: &str,
        category: AlertCategory,
        origin: AlertOrigin,
    ) -> Result<Option<i64>, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state
            .last_alert
            .get(&(device_id.to_string(), category, origin))
            .copied())
    }

    async fn resolve_alert(
        &self,
        alert_id: &str,
        resolved_by: &str,
        notes: Option<String>,
        resolved_at_ms: i64,
    ) -> Result<Alert, FleetError> {
        let mut state = self.state.write().map_err(|_| FleetError::lock_failed())?;
        let index = *state
            .alert_index
            .get(alert_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Alert, alert_id))?;
        let alert = &mut state.alerts[index];
        if let Some(resolved_at) = alert.resolved_at_ms {
            return Err(FleetError::AlreadyResolved {
                alert_id: alert_id.to_string(),
                resolved_at_ms: resolved_at,
            });
        }
        alert.active = false;
        alert.resolved_at_ms = Some(resolved_at_ms.max(alert.created_at_ms));
        alert.resolved_by = Some(resolved_by.to_string());
        alert.resolution_notes = notes;
        Ok(alert.clone())
    }

    async fn count_alerts(&self) -> Result<usize, FleetError> {
        let state = self.state.read().map_err(|_| FleetError::lock_failed())?;
        Ok(state.alerts.len())
    }
}
