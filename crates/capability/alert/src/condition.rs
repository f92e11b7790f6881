//! 规则条件树
//!
//! 条件以 JSON 描述（`op` 为标签），在读数 / 事件字段上求值：
//!
//! ```json
//! { "op": "all", "conditions": [
//!     { "op": "reading_type", "value": "motion" },
//!     { "op": "local_time_between", "start_minute": 1320, "end_minute": 360 }
//! ] }
//! ```

use domain::DeviceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MINUTES_PER_DAY: i64 = 1_440;

/// 规则求值错误。求值失败的规则在本次事件中被跳过。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("payload field missing: {0}")]
    MissingField(String),
    #[error("payload field {pointer} is not a number")]
    NotANumber { pointer: String },
    #[error("invalid condition: {0}")]
    InvalidCondition(String),
}

/// 求值输入：一条读数及其可选的离散事件类型。
#[derive(Debug, Clone, Copy)]
pub struct EvalInput<'a> {
    pub reading_type: &'a str,
    pub device_type: DeviceType,
    pub event_type: Option<&'a str>,
    pub value: f64,
    pub ts_ms: i64,
    pub payload: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    ReadingType {
        value: String,
    },
    DeviceType {
        value: DeviceType,
    },
    EventType {
        value: String,
    },
    ValueAbove {
        threshold: f64,
    },
    ValueBelow {
        threshold: f64,
    },
    ValueEquals {
        value: f64,
    },
    /// 本地时间窗口 `[start, end)`，单位为当日分钟；`start > end` 表示跨午夜。
    LocalTimeBetween {
        start_minute: u16,
        end_minute: u16,
        #[serde(default)]
        utc_offset_minutes: i32,
    },
    PayloadNumberAbove {
        pointer: String,
        threshold: f64,
    },
    PayloadEquals {
        pointer: String,
        value: Value,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

impl Condition {
    /// 结构校验（创建规则时调用）。
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            Self::LocalTimeBetween {
                start_minute,
                end_minute,
                utc_offset_minutes,
            } => {
                if i64::from(*start_minute) >= MINUTES_PER_DAY
                    || i64::from(*end_minute) >= MINUTES_PER_DAY
                {
                    return Err(RuleError::InvalidCondition(
                        "time window minutes must be below 1440".to_string(),
                    ));
                }
                if start_minute == end_minute {
                    return Err(RuleError::InvalidCondition(
                        "time window must not be empty".to_string(),
                    ));
                }
                if i64::from(utc_offset_minutes.unsigned_abs()) >= MINUTES_PER_DAY {
                    return Err(RuleError::InvalidCondition(
                        "utc offset out of range".to_string(),
                    ));
                }
                Ok(())
            }
            Self::PayloadNumberAbove { pointer, .. } | Self::PayloadEquals { pointer, .. } => {
                if !pointer.is_empty() && !pointer.starts_with('/') {
                    return Err(RuleError::InvalidCondition(format!(
                        "json pointer must start with '/': {pointer}"
                    )));
                }
                Ok(())
            }
            Self::ValueAbove { threshold }
            | Self::ValueBelow { threshold }
            | Self::ValueEquals { value: threshold } => {
                if !threshold.is_finite() {
                    return Err(RuleError::InvalidCondition(
                        "threshold must be finite".to_string(),
                    ));
                }
                Ok(())
            }
            Self::All { conditions } | Self::Any { conditions } => {
                conditions.iter().try_for_each(Condition::validate)
            }
            Self::Not { condition } => condition.validate(),
            Self::ReadingType { .. } | Self::DeviceType { .. } | Self::EventType { .. } => Ok(()),
        }
    }

    pub fn evaluate(&self, input: &EvalInput<'_>) -> Result<bool, RuleError> {
        match self {
            Self::ReadingType { value } => Ok(input.reading_type.eq_ignore_ascii_case(value)),
            Self::DeviceType { value } => Ok(input.device_type == *value),
            Self::EventType { value } => Ok(input
                .event_type
                .is_some_and(|event_type| event_type.eq_ignore_ascii_case(value))),
            Self::ValueAbove { threshold } => Ok(input.value > *threshold),
            Self::ValueBelow { threshold } => Ok(input.value < *threshold),
            Self::ValueEquals { value } => Ok(input.value == *value),
            Self::LocalTimeBetween {
                start_minute,
                end_minute,
                utc_offset_minutes,
            } => {
                let minute = local_minute_of_day(input.ts_ms, *utc_offset_minutes);
                let (start, end) = (i64::from(*start_minute), i64::from(*end_minute));
                Ok(if start <= end {
                    minute >= start && minute < end
                } else {
                    minute >= start || minute < end
                })
            }
            Self::PayloadNumberAbove { pointer, threshold } => {
                let field = input
                    .payload
                    .pointer(pointer)
                    .ok_or_else(|| RuleError::MissingField(pointer.clone()))?;
                let number = field.as_f64().ok_or_else(|| RuleError::NotANumber {
                    pointer: pointer.clone(),
                })?;
                Ok(number > *threshold)
            }
            Self::PayloadEquals { pointer, value } => {
                let field = input
                    .payload
                    .pointer(pointer)
                    .ok_or_else(|| RuleError::MissingField(pointer.clone()))?;
                Ok(field == value)
            }
            Self::All { conditions } => {
                for condition in conditions {
                    if !condition.evaluate(input)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any { conditions } => {
                for condition in conditions {
                    if condition.evaluate(input)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { condition } => Ok(!condition.evaluate(input)?),
        }
    }
}

/// 源时间戳换算成本地时间的当日分钟数。
pub fn local_minute_of_day(ts_ms: i64, utc_offset_minutes: i32) -> i64 {
    let minutes = ts_ms.div_euclid(60_000) + i64::from(utc_offset_minutes);
    minutes.rem_euclid(MINUTES_PER_DAY)
}
