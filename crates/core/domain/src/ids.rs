//! 实体 ID 生成
//!
//! 单调计数器 + 实体类型前缀，告警与事件额外带上创建日期：
//! - 告警：`ALR-20231114-000001`
//! - 事件：`EVT-20231114-000002`
//! - 读数：`RDG-000003`
//! - 用车记录：`USG-000004`
//! - 告警规则：`RULE-000005`
//!
//! 序号在同一生成器实例内全局递增，并发创建时也不会重复。

use std::sync::atomic::{AtomicU64, Ordering};

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从指定序号之后开始分配（用于从已有数据恢复）。
    pub fn starting_after(last: u64) -> Self {
        Self {
            counter: AtomicU64::new(last),
        }
    }

    fn next_seq(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn alert_id(&self, created_at_ms: i64) -> String {
        format!("ALR-{}-{:06}", date_stamp(created_at_ms), self.next_seq())
    }

    pub fn event_id(&self, ts_ms: i64) -> String {
        format!("EVT-{}-{:06}", date_stamp(ts_ms), self.next_seq())
    }

    pub fn reading_id(&self) -> String {
        format!("RDG-{:06}", self.next_seq())
    }

    pub fn usage_id(&self) -> String {
        format!("USG-{:06}", self.next_seq())
    }

    pub fn rule_id(&self) -> String {
        format!("RULE-{:06}", self.next_seq())
    }
}

/// `yyyymmdd`（UTC）。
pub fn date_stamp(ts_ms: i64) -> String {
    let (year, month, day) = civil_from_days(ts_ms.div_euclid(MS_PER_DAY));
    format!("{:04}{:02}{:02}", year, month, day)
}

/// 自 1970-01-01 起的天数转换为公历日期。
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
        assert_eq!(civil_from_days(19_675), (2023, 11, 14));
    }

    #[test]
    fn alert_id_carries_date_and_sequence() {
        let ids = IdGenerator::new();
        let id = ids.alert_id(1_699_927_200_000);
        assert_eq!(id, "ALR-20231114-000001");
        assert_eq!(ids.reading_id(), "RDG-000002");
    }
}
