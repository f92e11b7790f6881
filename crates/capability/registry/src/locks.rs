//! 单实体单写者锁
//!
//! 每个实体一把异步互斥锁，`try_lock` 失败后按指数退避重试，
//! 重试次数耗尽返回 `Contention`，等待时长受请求截止时间约束。
//! 多实体操作按实体引用排序后依次加锁。

use domain::{EntityRef, FleetError, RequestContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

/// 加锁重试策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: max_backoff.max(base_backoff),
        }
    }

    /// 第 `attempt` 次失败后的等待时长（从 1 开始）。
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(8, Duration::from_millis(5), Duration::from_millis(200))
    }
}

/// 已持有的实体锁，drop 时释放。
pub struct EntityGuard {
    entity: EntityRef,
    _guard: OwnedMutexGuard<()>,
}

impl EntityGuard {
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// 校验持有的是指定实体的锁。
    pub fn ensure_holds(&self, entity: &EntityRef) -> Result<(), FleetError> {
        if &self.entity != entity {
            return Err(FleetError::Backend(format!(
                "lock for {} held, {} required",
                self.entity, entity
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityGuard")
            .field("entity", &self.entity)
            .finish()
    }
}

pub struct EntityLocks {
    policy: RetryPolicy,
    slots: Mutex<HashMap<EntityRef, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn slot(&self, entity: &EntityRef) -> Result<Arc<AsyncMutex<()>>, FleetError> {
        let mut slots = self.slots.lock().map_err(|_| FleetError::lock_failed())?;
        Ok(slots
            .entry(entity.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// 获取单个实体的写锁。
    pub async fn acquire(
        &self,
        ctx: &RequestContext,
        entity: &EntityRef,
    ) -> Result<EntityGuard, FleetError> {
        let slot = self.slot(entity)?;
        let mut attempt = 0u32;
        loop {
            ctx.ensure_live()?;
            if let Ok(guard) = slot.clone().try_lock_owned() {
                return Ok(EntityGuard {
                    entity: entity.clone(),
                    _guard: guard,
                });
            }
            attempt += 1;
            if attempt >= self.policy.max_attempts {
                fleet_telemetry::record_lock_contention();
                warn!(
                    target: "fleet.registry",
                    entity = %entity,
                    attempts = attempt,
                    "lock_contention"
                );
                return Err(FleetError::Contention {
                    resource: entity.to_string(),
                    attempts: attempt,
                });
            }
            let mut wait = self.policy.backoff(attempt);
            if let Some(remaining) = ctx.remaining() {
                if remaining.is_zero() {
                    return Err(FleetError::DeadlineExceeded);
                }
                wait = wait.min(remaining);
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// 按实体引用排序后依次加锁，重复引用只加一次。
    pub async fn acquire_many(
        &self,
        ctx: &RequestContext,
        entities: &[EntityRef],
    ) -> Result<Vec<EntityGuard>, FleetError> {
        let mut ordered: Vec<&EntityRef> = entities.iter().collect();
        ordered.sort();
        ordered.dedup();
        let mut guards = Vec::with_capacity(ordered.len());
        for entity in ordered {
            guards.push(self.acquire(ctx, entity).await?);
        }
        Ok(guards)
    }

    /// 清理当前无人持有的锁槽位，返回清理数量。
    pub fn prune(&self) -> usize {
        let Ok(mut slots) = self.slots.lock() else {
            return 0;
        };
        let before = slots.len();
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        before - slots.len()
    }
}

impl Default for EntityLocks {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(35));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(2), Duration::from_millis(20));
        assert_eq!(policy.backoff(3), Duration::from_millis(35));
        assert_eq!(policy.backoff(40), Duration::from_millis(35));
    }

    #[tokio::test]
    async fn held_lock_exhausts_retries() {
        let locks = EntityLocks::new(RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(2),
        ));
        let ctx = RequestContext::system();
        let entity = EntityRef::vehicle("ABC1234");
        let _held = locks.acquire(&ctx, &entity).await.expect("first");
        let err = locks.acquire(&ctx, &entity).await.expect_err("second");
        assert_eq!(
            err,
            FleetError::Contention {
                resource: "vehicle:ABC1234".to_string(),
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = EntityLocks::default();
        let ctx = RequestContext::system();
        let guard = locks
            .acquire(&ctx, &EntityRef::device("SENSOR001"))
            .await
            .expect("lock");
        assert_eq!(locks.prune(), 0);
        drop(guard);
        assert_eq!(locks.prune(), 1);
    }
}
