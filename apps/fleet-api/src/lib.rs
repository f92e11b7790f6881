//! 车队状态同步 HTTP API：应用状态与路由装配。

pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod routes;
pub mod utils;

use axum::Router;
use fleet_alert::AlertEngine;
use fleet_ingest::Ingestor;
use fleet_query::QueryService;
use fleet_registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// 各 handler 共享的应用状态。
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub engine: Arc<AlertEngine>,
    pub ingestor: Ingestor,
    pub query: QueryService,
    /// 每个请求的截止时间；为零表示不设截止时间。
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<AlertEngine>, request_timeout: Duration) -> Self {
        Self {
            registry: engine.registry().clone(),
            ingestor: Ingestor::new(engine.clone()),
            query: QueryService::new(engine.clone()),
            engine,
            request_timeout,
        }
    }
}

/// 组装完整应用：`/health` + `/api/*`，外加请求追踪中间件。
pub fn build_app(state: AppState) -> Router {
    routes::create_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_context))
}
