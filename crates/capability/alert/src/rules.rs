//! 告警规则定义。

use crate::condition::Condition;
use domain::{AlertCategory, FleetError, Severity};
use serde::{Deserialize, Serialize};

/// 规则创建参数。冷却时间必须由调用方给出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    pub name: String,
    pub category: AlertCategory,
    pub severity: Severity,
    pub condition: Condition,
    pub title: String,
    /// 支持占位符 `{device}` `{value}` `{unit}` `{zone}` `{reading_type}`。
    #[serde(default)]
    pub description: String,
    pub cooldown_seconds: u64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl RuleSpec {
    pub fn validate(&self) -> Result<(), FleetError> {
        if self.name.trim().is_empty() {
            return Err(FleetError::validation("rule name is required"));
        }
        if self.title.trim().is_empty() {
            return Err(FleetError::validation("rule title is required"));
        }
        if let Some(confidence) = self.confidence
            && !(0.0..=1.0).contains(&confidence)
        {
            return Err(FleetError::validation("confidence must be within 0..=1"));
        }
        self.condition
            .validate()
            .map_err(|err| FleetError::validation(err.to_string()))
    }

    pub fn cooldown_ms(&self) -> i64 {
        i64::try_from(self.cooldown_seconds.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub rule_id: String,
    pub enabled: bool,
    pub created_at_ms: i64,
    #[serde(flatten)]
    pub spec: RuleSpec,
}

/// 模板替换时可用的字段。
#[derive(Debug, Clone, Copy)]
pub(crate) struct TemplateVars<'a> {
    pub device: &'a str,
    pub value: f64,
    pub unit: &'a str,
    pub zone: &'a str,
    pub reading_type: &'a str,
}

pub(crate) fn render(template: &str, vars: &TemplateVars<'_>) -> String {
    template
        .replace("{device}", vars.device)
        .replace("{value}", &vars.value.to_string())
        .replace("{unit}", vars.unit)
        .replace("{zone}", vars.zone)
        .replace("{reading_type}", vars.reading_type)
}
