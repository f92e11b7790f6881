//! fleet-api：HTTP API、MQTT 接入与后台任务（索引重建、离线巡检）。

use domain::{IdGenerator, RequestContext, SystemClock};
use fleet_alert::{AlertEngine, OfflineMonitor, OfflinePolicy, spawn_offline_monitor};
use fleet_api::{AppState, build_app, ingest::spawn_ingest};
use fleet_config::AppConfig;
use fleet_registry::{Registry, RegistryStores, RetryPolicy, SeedData, spawn_index_rebuild};
use fleet_telemetry::init_tracing;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let policy = RetryPolicy::new(
        config.lock_max_attempts,
        Duration::from_millis(config.lock_base_backoff_ms),
        Duration::from_millis(config.lock_max_backoff_ms),
    );
    let registry = Arc::new(Registry::new(
        RegistryStores::in_memory(),
        policy,
        Arc::new(IdGenerator::new()),
        Arc::new(SystemClock),
    ));
    let ctx = RequestContext::system();
    if config.seed_demo {
        registry.apply_seed(&ctx, &SeedData::demo()).await?;
    }

    let engine = Arc::new(AlertEngine::new(registry.clone()));
    if let Some(path) = config.rules_file.as_deref() {
        let rules = engine.load_rules_file(Path::new(path))?;
        info!(target: "fleet.alert", path, count = rules.len(), "rules_loaded");
    }

    let state = AppState::new(
        engine.clone(),
        Duration::from_millis(config.request_timeout_ms),
    );

    // 后台任务：索引重建、离线巡检、MQTT 接入
    let _rebuild = spawn_index_rebuild(
        registry.clone(),
        Duration::from_secs(config.index_rebuild_interval_seconds),
    );
    let monitor = Arc::new(OfflineMonitor::new(
        engine,
        OfflinePolicy {
            threshold_ms: seconds_to_ms(config.offline_threshold_seconds),
            alert_cooldown_ms: seconds_to_ms(config.offline_alert_cooldown_seconds),
        },
    ));
    let _offline = spawn_offline_monitor(
        monitor,
        Duration::from_secs(config.offline_sweep_interval_seconds),
    );
    let _ingest = spawn_ingest(&config, state.ingestor.clone());

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "fleet.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn seconds_to_ms(seconds: u64) -> i64 {
    i64::try_from(seconds.saturating_mul(1_000)).unwrap_or(i64::MAX)
}
