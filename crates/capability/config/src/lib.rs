//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub ingest_enabled: bool,
    pub lock_max_attempts: u32,
    pub lock_base_backoff_ms: u64,
    pub lock_max_backoff_ms: u64,
    pub request_timeout_ms: u64,
    pub offline_threshold_seconds: u64,
    pub offline_sweep_interval_seconds: u64,
    pub offline_alert_cooldown_seconds: u64,
    pub index_rebuild_interval_seconds: u64,
    pub rules_file: Option<String>,
    pub seed_demo: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("FLEET_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let ingest_enabled = read_bool_with_default("FLEET_MQTT_INGEST", false);
        // 开启 MQTT 接入时必须显式给出 broker 地址。
        let mqtt_host = match read_optional("FLEET_MQTT_HOST") {
            Some(host) => host,
            None if ingest_enabled => return Err(ConfigError::Missing("FLEET_MQTT_HOST".to_string())),
            None => "127.0.0.1".to_string(),
        };
        let mqtt_port = read_u16_with_default("FLEET_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("FLEET_MQTT_USERNAME");
        let mqtt_password = read_optional("FLEET_MQTT_PASSWORD");
        let mqtt_topic_prefix = env::var("FLEET_MQTT_TOPIC_PREFIX")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "fleet/devices".to_string());
        let lock_max_attempts = read_u32_with_default("FLEET_LOCK_MAX_ATTEMPTS", 8)?;
        let lock_base_backoff_ms = read_u64_with_default("FLEET_LOCK_BASE_BACKOFF_MS", 5)?;
        let lock_max_backoff_ms = read_u64_with_default("FLEET_LOCK_MAX_BACKOFF_MS", 200)?;
        if lock_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "FLEET_LOCK_MAX_ATTEMPTS".to_string(),
                "0".to_string(),
            ));
        }
        let request_timeout_ms = read_u64_with_default("FLEET_REQUEST_TIMEOUT_MS", 5_000)?;
        let offline_threshold_seconds =
            read_u64_with_default("FLEET_OFFLINE_THRESHOLD_SECONDS", 1_800)?;
        let offline_sweep_interval_seconds =
            read_u64_with_default("FLEET_OFFLINE_SWEEP_INTERVAL_SECONDS", 60)?;
        let offline_alert_cooldown_seconds =
            read_u64_with_default("FLEET_OFFLINE_ALERT_COOLDOWN_SECONDS", 3_600)?;
        let index_rebuild_interval_seconds =
            read_u64_with_default("FLEET_INDEX_REBUILD_INTERVAL_SECONDS", 300)?;
        let rules_file = read_optional("FLEET_RULES_FILE");
        let seed_demo = read_bool_with_default("FLEET_SEED_DEMO", false);

        Ok(Self {
            http_addr,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            ingest_enabled,
            lock_max_attempts,
            lock_base_backoff_ms,
            lock_max_backoff_ms,
            request_timeout_ms,
            offline_threshold_seconds,
            offline_sweep_interval_seconds,
            offline_alert_cooldown_seconds,
            index_rebuild_interval_seconds,
            rules_file,
            seed_demo,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
