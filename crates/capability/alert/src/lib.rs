//! 告警引擎
//!
//! - 规则：条件树 + 类别 + 严重度 + 标题/描述模板 + 冷却时间
//! - 求值只产出候选告警，由接入方与读数在同一次提交中落盘
//! - 冷却：同一设备 + 类别在冷却时间内（按源时间戳计）只告警一次
//! - 状态机：`active → resolved`，不可逆
//! - 离线巡检：长时间无通讯的设备标记离线并产生系统告警

pub mod condition;
pub mod engine;
pub mod offline;
pub mod rules;

pub use condition::{Condition, EvalInput, RuleError, local_minute_of_day};
pub use engine::{AlertEngine, sort_for_display};
pub use offline::{
    OFFLINE_ALERT_TITLE, OfflineMonitor, OfflinePolicy, OfflineSweep, spawn_offline_monitor,
};
pub use rules::{AlertRule, RuleSpec};
