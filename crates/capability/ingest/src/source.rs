//! 采集源：MQTT 主题 `<prefix>/<deviceId>/...`，负载为 JSON。

use crate::ingestor::{IngestRequest, Ingestor};
use crate::IngestError;
use async_trait::async_trait;
use domain::RequestContext;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// 采集源收到的原始消息。接收时间由 `Ingestor` 按注册表时钟记录。
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// RawMessage 处理器。
#[async_trait]
pub trait RawEventHandler: Send + Sync {
    async fn handle(&self, message: RawMessage) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn RawEventHandler>) -> Result<(), IngestError>;
}

/// 设备上报负载。同时接受葡萄牙语字段名。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevicePayload {
    #[serde(alias = "tipo", alias = "reading_type")]
    reading_type: String,
    #[serde(alias = "valor")]
    value: Value,
    #[serde(default, alias = "unidade")]
    unit: String,
    #[serde(alias = "ts", alias = "tsMs", alias = "ts_ms")]
    timestamp: Option<i64>,
    #[serde(default, alias = "type", alias = "event_type", alias = "evento")]
    event_type: Option<String>,
}

/// 从主题中取设备 ID（前缀之后的第一段）。
pub fn device_from_topic(prefix: &str, topic: &str) -> Option<String> {
    let prefix = prefix.trim_matches('/');
    let topic = topic.trim_matches('/');
    let rest = if prefix.is_empty() {
        topic
    } else {
        topic.strip_prefix(prefix)?.strip_prefix('/')?
    };
    let device_id = rest.split('/').next()?.trim();
    if device_id.is_empty() {
        return None;
    }
    Some(device_id.to_string())
}

/// 解析负载。布尔值按 1 / 0 记。
///
/// 源时间戳必填：它是去重键的一部分，QoS 1 重投的消息必须落到同一个键上。
pub fn parse_payload(device_id: &str, payload: &[u8]) -> Result<IngestRequest, IngestError> {
    let raw: Value =
        serde_json::from_slice(payload).map_err(|err| IngestError::Payload(err.to_string()))?;
    let parsed: DevicePayload = serde_json::from_value(raw.clone())
        .map_err(|err| IngestError::Payload(err.to_string()))?;
    let value = match &parsed.value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| IngestError::Payload("value out of range".to_string()))?,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        other => {
            return Err(IngestError::Payload(format!(
                "value must be a number or boolean, got {other}"
            )));
        }
    };
    let ts_ms = parsed
        .timestamp
        .ok_or_else(|| IngestError::Payload("source timestamp is required".to_string()))?;
    Ok(IngestRequest {
        device_id: device_id.to_string(),
        reading_type: parsed.reading_type,
        value,
        unit: parsed.unit,
        ts_ms,
        raw_payload: raw,
        event_type: parsed.event_type,
    })
}

/// 把 MQTT 消息交给 `Ingestor`；每条消息一个带超时的上下文。
pub struct IngestHandler {
    ingestor: Ingestor,
    topic_prefix: String,
    timeout: Duration,
}

impl IngestHandler {
    pub fn new(ingestor: Ingestor, topic_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ingestor,
            topic_prefix: topic_prefix.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RawEventHandler for IngestHandler {
    async fn handle(&self, message: RawMessage) -> Result<(), IngestError> {
        let device_id = device_from_topic(&self.topic_prefix, &message.topic)
            .ok_or_else(|| IngestError::Topic(message.topic.clone()))?;
        let request = parse_payload(&device_id, &message.payload)?;
        let ctx = RequestContext::new("mqtt", None).with_timeout(self.timeout);
        self.ingestor
            .ingest(&ctx, request)
            .await
            .map(|_| ())
            .map_err(|err| IngestError::Handler(err.to_string()))
    }
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn RawEventHandler>) -> Result<(), IngestError> {
        let client_id = format!("fleet-ingest-{}", uuid::Uuid::new_v4());
        let mut options =
            rumqttc::MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 10);
        let topic = format!("{}/#", self.config.topic_prefix.trim_end_matches('/'));
        client
            .subscribe(topic, rumqttc::QoS::AtLeastOnce)
            .await
            .map_err(|err| IngestError::Source(err.to_string()))?;

        loop {
            match eventloop.poll().await {
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                    let message = RawMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    };
                    if let Err(err) = handler.handle(message).await {
                        warn!(
                            target: "fleet.ingest",
                            topic = %publish.topic,
                            error = %err,
                            "mqtt_message_rejected"
                        );
                    }
                }
                Ok(_) => {}
                Err(err) => return Err(IngestError::Source(err.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_first_segment_after_prefix() {
        assert_eq!(
            device_from_topic("fleet/devices", "fleet/devices/SENSOR001/readings"),
            Some("SENSOR001".to_string())
        );
        assert_eq!(
            device_from_topic("fleet/devices/", "/fleet/devices/CAMERA001"),
            Some("CAMERA001".to_string())
        );
        assert_eq!(device_from_topic("fleet/devices", "other/SENSOR001"), None);
        assert_eq!(device_from_topic("fleet/devices", "fleet/devicesX/SENSOR001"), None);
        assert_eq!(device_from_topic("fleet/devices", "fleet/devices"), None);
    }
}
