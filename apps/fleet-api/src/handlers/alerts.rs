//! 告警与告警规则 handlers
//!
//! - GET /api/alerts - 活动告警（严重度降序，其次创建时间降序），可按分区、类别、最低级别、设备过滤
//! - GET /api/alerts/:alert_id - 告警详情
//! - POST /api/alerts/:alert_id/resolve - 解决告警（不可重复解决）
//! - GET /api/alert-rules - 规则列表
//! - POST /api/alert-rules - 创建规则（冷却时间必填）
//! - PUT /api/alert-rules/:rule_id - 启用 / 停用规则
//! - DELETE /api/alert-rules/:rule_id - 删除规则

use crate::AppState;
use crate::middleware::require_request_context;
use crate::utils::response::{alert_to_dto, bad_request_error, fleet_error, ok, rule_to_dto};
use crate::utils::{normalize_optional, normalize_required, parse_field};
use api_contract::{
    AlertDto, AlertListQuery, CreateRuleRequest, ResolveAlertRequest, RuleDto, RuleToggleRequest,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use domain::{AlertCategory, Severity};
use fleet_alert::{Condition, RuleSpec};
use fleet_storage::AlertQuery;

#[derive(serde::Deserialize)]
pub struct AlertPath {
    alert_id: String,
}

#[derive(serde::Deserialize)]
pub struct RulePath {
    rule_id: String,
}

/// 列出活动告警
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let category = match query.category.as_deref() {
        Some(value) => match parse_field::<AlertCategory>(value) {
            Ok(category) => Some(category),
            Err(response) => return response,
        },
        None => None,
    };
    let min_severity = match query.min_severity.as_deref() {
        Some(value) => match parse_field::<Severity>(value) {
            Ok(severity) => Some(severity),
            Err(response) => return response,
        },
        None => None,
    };
    let filter = AlertQuery {
        active_only: true,
        zone: optional_filter(query.zone),
        category,
        min_severity,
        device_id: optional_filter(query.device_id),
    };
    match state.query.active_alerts(&ctx, filter).await {
        Ok(items) => {
            let now = state.registry.now_ms();
            let data: Vec<AlertDto> = items
                .into_iter()
                .map(|alert| alert_to_dto(alert, now))
                .collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

pub async fn get_alert(
    State(state): State<AppState>,
    Path(path): Path<AlertPath>,
    headers: HeaderMap,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    match state.engine.get_alert(&ctx, &path.alert_id).await {
        Ok(alert) => ok(StatusCode::OK, alert_to_dto(alert, state.registry.now_ms())),
        Err(err) => fleet_error(err),
    }
}

/// 解决告警
///
/// 已解决的告警再次解决返回 `409 CONFLICT`（`ALERT.ALREADY_RESOLVED`），记录保持不变。
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(path): Path<AlertPath>,
    headers: HeaderMap,
    Json(req): Json<ResolveAlertRequest>,
) -> Response {
    let ctx = require_request_context(&state, &headers);
    let resolver_id = match normalize_required(req.resolver_id, "resolverId") {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state
        .engine
        .resolve(&ctx, &path.alert_id, &resolver_id, req.notes)
        .await
    {
        Ok(alert) => ok(StatusCode::OK, alert_to_dto(alert, state.registry.now_ms())),
        Err(err) => fleet_error(err),
    }
}

pub async fn list_rules(State(state): State<AppState>) -> Response {
    match state.engine.list_rules() {
        Ok(rules) => {
            let data: Vec<RuleDto> = rules.into_iter().map(rule_to_dto).collect();
            ok(StatusCode::OK, data)
        }
        Err(err) => fleet_error(err),
    }
}

/// 创建告警规则
///
/// # 流程
///
/// 1. 校验名称、标题必填，冷却时间必须显式给出（不假设默认值）
/// 2. 解析类别、级别与条件树
/// 3. 调用 `AlertEngine::create_rule` 校验并登记规则
///
/// # 错误处理
///
/// - `400 BAD REQUEST`: 字段缺失、枚举非法或条件树非法
pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> Response {
    let name = match normalize_required(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let title = match normalize_required(req.title, "title") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Some(cooldown_seconds) = req.cooldown_seconds else {
        return bad_request_error("cooldownSeconds required");
    };
    let category = match parse_field::<AlertCategory>(&req.category) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let severity = match parse_field::<Severity>(&req.severity) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let condition = match serde_json::from_value::<Condition>(req.condition) {
        Ok(value) => value,
        Err(err) => return bad_request_error(format!("invalid condition: {err}")),
    };
    let spec = RuleSpec {
        name,
        category,
        severity,
        condition,
        title,
        description: req.description,
        cooldown_seconds,
        confidence: req.confidence,
    };
    match state.engine.create_rule(spec) {
        Ok(rule) => ok(StatusCode::CREATED, rule_to_dto(rule)),
        Err(err) => fleet_error(err),
    }
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(path): Path<RulePath>,
    Json(req): Json<RuleToggleRequest>,
) -> Response {
    match state.engine.set_rule_enabled(&path.rule_id, req.enabled) {
        Ok(rule) => ok(StatusCode::OK, rule_to_dto(rule)),
        Err(err) => fleet_error(err),
    }
}

pub async fn delete_rule(State(state): State<AppState>, Path(path): Path<RulePath>) -> Response {
    match state.engine.remove_rule(&path.rule_id) {
        Ok(rule) => ok(StatusCode::OK, rule_to_dto(rule)),
        Err(err) => fleet_error(err),
    }
}

/// 过滤参数中的空字符串视为未给出
fn optional_filter(value: Option<String>) -> Option<String> {
    normalize_optional(value, "filter").ok().flatten()
}
