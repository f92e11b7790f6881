//! 请求上下文
//!
//! - request_context：注入 request_id/trace_id 的中间件
//! - require_request_context：为 handler 构造带截止时间的 `RequestContext`
//!
//! 调用方身份取自 `x-actor-id` 请求头，缺省为 `anonymous`。

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use domain::RequestContext;
use fleet_telemetry::new_request_ids;
use tracing::{Instrument, info_span};

use crate::AppState;

pub const ACTOR_HEADER: &str = "x-actor-id";
const ANONYMOUS: &str = "anonymous";

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

/// 从请求头提取调用方身份
pub fn actor_id(headers: &HeaderMap) -> &str {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS)
}

/// 构造请求上下文（调用方身份 + 配置的请求超时）
pub fn require_request_context(state: &AppState, headers: &HeaderMap) -> RequestContext {
    let ctx = RequestContext::new(actor_id(headers), None);
    if state.request_timeout.is_zero() {
        return ctx;
    }
    ctx.with_timeout(state.request_timeout)
}
