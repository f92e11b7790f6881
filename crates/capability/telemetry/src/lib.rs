//! 追踪、请求 ID 生成与计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub readings_ingested: u64,
    pub readings_duplicate: u64,
    pub readings_rejected: u64,
    pub events_recorded: u64,
    pub alerts_created: u64,
    pub alerts_suppressed: u64,
    pub alerts_resolved: u64,
    pub rule_failures: u64,
    pub lock_contention: u64,
    pub deadline_exceeded: u64,
    pub index_rebuilds: u64,
    pub devices_marked_offline: u64,
    pub ingest_latency_ms_total: u64,
    pub ingest_latency_ms_count: u64,
}

/// 进程内计数指标。
pub struct TelemetryMetrics {
    readings_ingested: AtomicU64,
    readings_duplicate: AtomicU64,
    readings_rejected: AtomicU64,
    events_recorded: AtomicU64,
    alerts_created: AtomicU64,
    alerts_suppressed: AtomicU64,
    alerts_resolved: AtomicU64,
    rule_failures: AtomicU64,
    lock_contention: AtomicU64,
    deadline_exceeded: AtomicU64,
    index_rebuilds: AtomicU64,
    devices_marked_offline: AtomicU64,
    ingest_latency_ms_total: AtomicU64,
    ingest_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            readings_ingested: AtomicU64::new(0),
            readings_duplicate: AtomicU64::new(0),
            readings_rejected: AtomicU64::new(0),
            events_recorded: AtomicU64::new(0),
            alerts_created: AtomicU64::new(0),
            alerts_suppressed: AtomicU64::new(0),
            alerts_resolved: AtomicU64::new(0),
            rule_failures: AtomicU64::new(0),
            lock_contention: AtomicU64::new(0),
            deadline_exceeded: AtomicU64::new(0),
            index_rebuilds: AtomicU64::new(0),
            devices_marked_offline: AtomicU64::new(0),
            ingest_latency_ms_total: AtomicU64::new(0),
            ingest_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_ingested: self.readings_ingested.load(Ordering::Relaxed),
            readings_duplicate: self.readings_duplicate.load(Ordering::Relaxed),
            readings_rejected: self.readings_rejected.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            alerts_created: self.alerts_created.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            alerts_resolved: self.alerts_resolved.load(Ordering::Relaxed),
            rule_failures: self.rule_failures.load(Ordering::Relaxed),
            lock_contention: self.lock_contention.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            index_rebuilds: self.index_rebuilds.load(Ordering::Relaxed),
            devices_marked_offline: self.devices_marked_offline.load(Ordering::Relaxed),
            ingest_latency_ms_total: self.ingest_latency_ms_total.load(Ordering::Relaxed),
            ingest_latency_ms_count: self.ingest_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录读数入库次数。
pub fn record_reading_ingested() {
    metrics().readings_ingested.fetch_add(1, Ordering::Relaxed);
}

/// 记录重复读数次数（返回原读数 ID）。
pub fn record_reading_duplicate() {
    metrics().readings_duplicate.fetch_add(1, Ordering::Relaxed);
}

/// 记录被拒绝的读数（未知设备、非法值、内容冲突）。
pub fn record_reading_rejected() {
    metrics().readings_rejected.fetch_add(1, Ordering::Relaxed);
}

pub fn record_event_recorded() {
    metrics().events_recorded.fetch_add(1, Ordering::Relaxed);
}

pub fn record_alert_created() {
    metrics().alerts_created.fetch_add(1, Ordering::Relaxed);
}

/// 记录冷却窗口内被抑制的告警。
pub fn record_alert_suppressed() {
    metrics().alerts_suppressed.fetch_add(1, Ordering::Relaxed);
}

pub fn record_alert_resolved() {
    metrics().alerts_resolved.fetch_add(1, Ordering::Relaxed);
}

/// 记录规则评估失败次数。
pub fn record_rule_failure() {
    metrics().rule_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录实体锁重试耗尽次数。
pub fn record_lock_contention() {
    metrics().lock_contention.fetch_add(1, Ordering::Relaxed);
}

pub fn record_deadline_exceeded() {
    metrics().deadline_exceeded.fetch_add(1, Ordering::Relaxed);
}

/// 记录位置索引全量重建次数。
pub fn record_index_rebuild() {
    metrics().index_rebuilds.fetch_add(1, Ordering::Relaxed);
}

pub fn record_device_marked_offline() {
    metrics()
        .devices_marked_offline
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录接入处理耗时（毫秒，包含规则评估与提交）。
pub fn record_ingest_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .ingest_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .ingest_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
