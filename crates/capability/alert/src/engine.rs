//! 告警引擎：规则管理、读数求值、告警解决与活动告警列表。

use crate::condition::EvalInput;
use crate::rules::{AlertRule, RuleSpec, TemplateVars, render};
use domain::{
    Alert, AlertCategory, AlertOrigin, Device, EntityKind, EntityRef, FleetError, RequestContext,
    SensorReading, Severity,
};
use fleet_registry::Registry;
use fleet_storage::AlertQuery;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub struct AlertEngine {
    registry: Arc<Registry>,
    rules: RwLock<BTreeMap<String, AlertRule>>,
}

impl AlertEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            rules: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn create_rule(&self, spec: RuleSpec) -> Result<AlertRule, FleetError> {
        spec.validate()?;
        let rule = AlertRule {
            rule_id: self.registry.ids().rule_id(),
            enabled: true,
            created_at_ms: self.registry.now_ms(),
            spec,
        };
        let mut rules = self.rules.write().map_err(|_| FleetError::lock_failed())?;
        rules.insert(rule.rule_id.clone(), rule.clone());
        info!(
            target: "fleet.alert",
            rule_id = %rule.rule_id,
            name = %rule.spec.name,
            cooldown_seconds = rule.spec.cooldown_seconds,
            "rule_created"
        );
        Ok(rule)
    }

    pub fn list_rules(&self) -> Result<Vec<AlertRule>, FleetError> {
        let rules = self.rules.read().map_err(|_| FleetError::lock_failed())?;
        Ok(rules.values().cloned().collect())
    }

    pub fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> Result<AlertRule, FleetError> {
        let mut rules = self.rules.write().map_err(|_| FleetError::lock_failed())?;
        let rule = rules
            .get_mut(rule_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Rule, rule_id))?;
        rule.enabled = enabled;
        Ok(rule.clone())
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<AlertRule, FleetError> {
        let mut rules = self.rules.write().map_err(|_| FleetError::lock_failed())?;
        rules
            .remove(rule_id)
            .ok_or_else(|| FleetError::not_found(EntityKind::Rule, rule_id))
    }

    /// 从 JSON 文件（规则数组）加载规则。任一规则非法则整体不加载。
    pub fn load_rules_file(&self, path: &Path) -> Result<Vec<AlertRule>, FleetError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| FleetError::Backend(format!("read {}: {err}", path.display())))?;
        let specs: Vec<RuleSpec> = serde_json::from_str(&raw)
            .map_err(|err| FleetError::validation(format!("rules file {}: {err}", path.display())))?;
        for spec in &specs {
            spec.validate()?;
        }
        specs
            .into_iter()
            .map(|spec| self.create_rule(spec))
            .collect()
    }

    /// 对一条读数求值所有启用的规则，返回待提交的告警。
    ///
    /// 只计算不落盘；调用方在同一次提交中写入读数与告警。
    /// 调用方须持有设备锁，冷却判断才不会与同设备的并发写入交错。
    pub async fn evaluate(
        &self,
        device: &Device,
        reading: &SensorReading,
        event_type: Option<&str>,
    ) -> Result<Vec<Alert>, FleetError> {
        let rules: Vec<AlertRule> = {
            let rules = self.rules.read().map_err(|_| FleetError::lock_failed())?;
            rules.values().filter(|rule| rule.enabled).cloned().collect()
        };
        let input = EvalInput {
            reading_type: &reading.reading_type,
            device_type: device.device_type,
            event_type,
            value: reading.value,
            ts_ms: reading.ts_ms,
            payload: &reading.raw_payload,
        };
        let vars = TemplateVars {
            device: &device.device_id,
            value: reading.value,
            unit: &reading.unit,
            zone: &device.location.zone,
            reading_type: &reading.reading_type,
        };

        let mut pending: HashMap<AlertCategory, i64> = HashMap::new();
        let mut alerts = Vec::new();
        for rule in rules {
            match rule.spec.condition.evaluate(&input) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    fleet_telemetry::record_rule_failure();
                    warn!(
                        target: "fleet.alert",
                        rule_id = %rule.rule_id,
                        device_id = %device.device_id,
                        error = %err,
                        "rule_evaluation_failed"
                    );
                    continue;
                }
            }
            let category = rule.spec.category;
            let previous = match pending.get(&category) {
                Some(ts) => Some(*ts),
                None => {
                    self.registry
                        .stores()
                        .alerts
                        .last_alert_ts(&device.device_id, category, AlertOrigin::Rule)
                        .await?
                }
            };
            if in_cooldown(previous, reading.ts_ms, rule.spec.cooldown_ms()) {
                fleet_telemetry::record_alert_suppressed();
                info!(
                    target: "fleet.alert",
                    rule_id = %rule.rule_id,
                    device_id = %device.device_id,
                    category = category.as_str(),
                    "alert_suppressed"
                );
                continue;
            }
            pending.insert(category, reading.ts_ms);

            let now = self.registry.now_ms();
            let mut metadata = BTreeMap::new();
            metadata.insert("rule_name".to_string(), json!(rule.spec.name));
            metadata.insert("reading_type".to_string(), json!(reading.reading_type));
            metadata.insert("value".to_string(), json!(reading.value));
            metadata.insert("unit".to_string(), json!(reading.unit));
            alerts.push(Alert {
                alert_id: self.registry.ids().alert_id(now),
                category,
                severity: rule.spec.severity,
                title: render(&rule.spec.title, &vars),
                description: render(&rule.spec.description, &vars),
                device_id: Some(device.device_id.clone()),
                vehicle_plate: None,
                zone: Some(device.location.zone.clone()),
                active: true,
                created_at_ms: now,
                source_ts_ms: reading.ts_ms,
                resolved_at_ms: None,
                resolved_by: None,
                resolution_notes: None,
                reading_id: Some(reading.reading_id.clone()),
                event_id: None,
                rule_id: Some(rule.rule_id.clone()),
                confidence: rule.spec.confidence,
                metadata,
            });
        }
        Ok(alerts)
    }

    /// 冷却判断（设备 + 类别 + 来源），供巡检等直接告警的路径使用。
    ///
    /// `ts_ms` 必须与该来源槽位的时间基准一致：规则告警用读数源时间，
    /// 巡检告警用服务端时钟。两类告警互不抑制。
    pub async fn cooldown_allows(
        &self,
        device_id: &str,
        category: AlertCategory,
        origin: AlertOrigin,
        ts_ms: i64,
        cooldown_ms: i64,
    ) -> Result<bool, FleetError> {
        let previous = self
            .registry
            .stores()
            .alerts
            .last_alert_ts(device_id, category, origin)
            .await?;
        Ok(!in_cooldown(previous, ts_ms, cooldown_ms))
    }

    /// 解决告警：`active → resolved`。重复解决返回 `AlreadyResolved`，记录不变。
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        alert_id: &str,
        resolver_id: &str,
        notes: Option<String>,
    ) -> Result<Alert, FleetError> {
        let resolver_id = resolver_id.trim();
        if resolver_id.is_empty() {
            return Err(FleetError::validation("resolver id is required"));
        }
        let _lock = self
            .registry
            .locks()
            .acquire(ctx, &EntityRef::new(EntityKind::Alert, alert_id))
            .await?;
        let _gate = self.registry.write_gate(ctx).await?;
        let now = self.registry.now_ms();
        let alert = self
            .registry
            .stores()
            .alerts
            .resolve_alert(alert_id, resolver_id, notes, now)
            .await?;
        fleet_telemetry::record_alert_resolved();
        info!(
            target: "fleet.alert",
            alert_id,
            resolver_id,
            open_minutes = alert.open_minutes(now),
            "alert_resolved"
        );
        Ok(alert)
    }

    pub async fn get_alert(&self, ctx: &RequestContext, alert_id: &str) -> Result<Alert, FleetError> {
        let _gate = self.registry.read_gate(ctx).await?;
        self.registry
            .stores()
            .alerts
            .find_alert(alert_id)
            .await?
            .ok_or_else(|| FleetError::not_found(EntityKind::Alert, alert_id))
    }

    /// 活动告警：严重度降序，其次创建时间降序。
    pub async fn list_active(
        &self,
        ctx: &RequestContext,
        mut query: AlertQuery,
    ) -> Result<Vec<Alert>, FleetError> {
        query.active_only = true;
        let mut alerts = {
            let _gate = self.registry.read_gate(ctx).await?;
            self.registry.stores().alerts.list_alerts(&query).await?
        };
        sort_for_display(&mut alerts);
        Ok(alerts)
    }

    /// 直接写入一条告警（不经读数）。冷却由调用方判断。
    pub(crate) async fn insert_alert(
        &self,
        ctx: &RequestContext,
        alert: Alert,
    ) -> Result<Alert, FleetError> {
        let _gate = self.registry.write_gate(ctx).await?;
        self.registry
            .stores()
            .alerts
            .insert_alert(alert.clone())
            .await?;
        fleet_telemetry::record_alert_created();
        info!(
            target: "fleet.alert",
            alert_id = %alert.alert_id,
            category = alert.category.as_str(),
            severity = alert.severity.as_str(),
            "alert_created"
        );
        Ok(alert)
    }

    pub(crate) fn system_alert(
        &self,
        device: &Device,
        severity: Severity,
        title: &str,
        description: String,
        source_ts_ms: i64,
        metadata: BTreeMap<String, Value>,
    ) -> Alert {
        let now = self.registry.now_ms();
        Alert {
            alert_id: self.registry.ids().alert_id(now),
            category: AlertCategory::System,
            severity,
            title: title.to_string(),
            description,
            device_id: Some(device.device_id.clone()),
            vehicle_plate: None,
            zone: Some(device.location.zone.clone()),
            active: true,
            created_at_ms: now,
            source_ts_ms,
            resolved_at_ms: None,
            resolved_by: None,
            resolution_notes: None,
            reading_id: None,
            event_id: None,
            rule_id: None,
            confidence: None,
            metadata,
        }
    }
}

fn in_cooldown(previous: Option<i64>, source_ts_ms: i64, cooldown_ms: i64) -> bool {
    match previous {
        Some(previous) => source_ts_ms.abs_diff(previous) < cooldown_ms.unsigned_abs(),
        None => false,
    }
}

pub fn sort_for_display(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
            .then_with(|| b.alert_id.cmp(&a.alert_id))
    });
}

#[cfg(test)]
mod tests {
    use super::in_cooldown;

    #[test]
    fn cooldown_uses_absolute_source_distance() {
        assert!(!in_cooldown(None, 1_000, 60_000));
        assert!(in_cooldown(Some(1_000), 30_000, 60_000));
        assert!(in_cooldown(Some(30_000), 1_000, 60_000));
        assert!(!in_cooldown(Some(1_000), 61_000, 60_000));
        assert!(!in_cooldown(Some(1_000), 1_000, 0));
    }
}
