//! 统一错误分类
//!
//! 所有能力模块共享的错误类型。`code()` 返回稳定的错误码，供 HTTP 层映射状态码。

use crate::assets::EntityKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FleetError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("duplicate reading: {reading_id}")]
    DuplicateReading { reading_id: String },
    #[error("alert already resolved: {alert_id}")]
    AlreadyResolved { alert_id: String, resolved_at_ms: i64 },
    #[error("contention on {resource} after {attempts} attempts")]
    Contention { resource: String, attempts: u32 },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("backend error: {0}")]
    Backend(String),
}

impl FleetError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// 锁中毒等后端异常。
    pub fn lock_failed() -> Self {
        Self::Backend("lock failed".to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "RESOURCE.NOT_FOUND",
            Self::Conflict(_) => "RESOURCE.CONFLICT",
            Self::UnknownDevice(_) => "INGEST.UNKNOWN_DEVICE",
            Self::DuplicateReading { .. } => "INGEST.DUPLICATE_READING",
            Self::AlreadyResolved { .. } => "ALERT.ALREADY_RESOLVED",
            Self::Contention { .. } => "RESOURCE.CONTENTION",
            Self::Validation(_) => "INVALID.REQUEST",
            Self::DeadlineExceeded => "REQUEST.DEADLINE_EXCEEDED",
            Self::Backend(_) => "INTERNAL.ERROR",
        }
    }
}
