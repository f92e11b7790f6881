//! 采集链路装配
//!
//! 开启 MQTT 接入时，订阅 `<prefix>/<deviceId>/…` 主题，每条消息经
//! `IngestHandler` 交给 `Ingestor`（带请求超时）。

use fleet_config::AppConfig;
use fleet_ingest::{IngestHandler, Ingestor, MqttSource, MqttSourceConfig, RawEventHandler, Source};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 启动 MQTT 采集任务；未开启接入时返回 `None`。
pub fn spawn_ingest(config: &AppConfig, ingestor: Ingestor) -> Option<JoinHandle<()>> {
    if !config.ingest_enabled {
        info!(target: "fleet.ingest", "ingest source disabled (FLEET_MQTT_INGEST=off)");
        return None;
    }
    let mqtt_config = MqttSourceConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        topic_prefix: config.mqtt_topic_prefix.clone(),
    };
    info!(
        target: "fleet.ingest",
        host = %mqtt_config.host,
        port = mqtt_config.port,
        prefix = %mqtt_config.topic_prefix,
        "ingest_source_mqtt"
    );
    let handler: Arc<dyn RawEventHandler> = Arc::new(IngestHandler::new(
        ingestor,
        mqtt_config.topic_prefix.clone(),
        Duration::from_millis(config.request_timeout_ms),
    ));
    let source: Arc<dyn Source> = Arc::new(MqttSource::new(mqtt_config));
    Some(tokio::spawn(async move {
        if let Err(err) = source.run(handler).await {
            warn!(target: "fleet.ingest", error = %err, "ingest_stopped");
        }
    }))
}
