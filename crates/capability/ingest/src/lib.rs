//! 事件接入
//!
//! `Ingestor` 把设备读数规范化为读数记录（必要时附带事件），与规则产生的告警
//! 一起原子提交；`(设备, 源时间戳)` 相同的重复上报返回首次接入的读数 ID。
//! `MqttSource` 订阅设备主题并把消息交给 `IngestHandler`。

pub mod ingestor;
pub mod source;

pub use ingestor::{IngestReceipt, IngestRequest, Ingestor, RULE_MATCH_EVENT};
pub use source::{
    IngestHandler, MqttSource, MqttSourceConfig, RawEventHandler, RawMessage, Source,
    device_from_topic, parse_payload,
};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("unroutable topic: {0}")]
    Topic(String),
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}
