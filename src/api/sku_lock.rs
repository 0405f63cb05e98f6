// ==========================================
// 仓库订单履约看板 - SKU 级串行锁
// ==========================================
// 职责: 串行化"读取接单状态 → 重算 → 写入接单"周期
// 约束: 多个 SKU 按字典序加锁，避免死锁
//       锁集合释放时回收无人等待的 SKU 条目，注册表只保留在途 SKU
// ==========================================

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    // 注册表锁只在取/删 Arc 时短暂持有；中毒时沿用内部数据
    locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 每个 SKU 一把异步锁（按需创建，进程内共享）
#[derive(Default)]
pub struct SkuLockRegistry {
    locks: Arc<Mutex<LockMap>>,
}

/// 持有期间独占相关 SKU；drop 时释放
pub struct SkuLockSet {
    skus: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl SkuLockSet {
    pub fn skus(&self) -> &[String] {
        &self.skus
    }
}

impl Drop for SkuLockSet {
    fn drop(&mut self) {
        // 先释放守卫，守卫本身持有 Arc
        self.guards.clear();

        let mut locks = lock_map(&self.locks);
        for sku in &self.skus {
            // 计数为 1: 只剩注册表自身，没有等待者
            if locks.get(sku).is_some_and(|m| Arc::strong_count(m) == 1) {
                locks.remove(sku);
            }
        }
    }
}

impl SkuLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前登记的 SKU 数
    pub fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }

    fn lock_for(&self, sku: &str) -> Arc<AsyncMutex<()>> {
        lock_map(&self.locks)
            .entry(sku.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// 按排序后的去重 SKU 依次加锁
    pub async fn acquire<I, S>(&self, skus: I) -> SkuLockSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ordered: BTreeSet<String> = skus
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut guards = Vec::with_capacity(ordered.len());
        for sku in &ordered {
            guards.push(self.lock_for(sku).lock_owned().await);
        }

        SkuLockSet {
            skus: ordered.into_iter().collect(),
            guards,
            locks: Arc::clone(&self.locks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_sorts_and_dedupes() {
        let registry = SkuLockRegistry::new();
        let set = registry.acquire(["B", "A", "B", " "]).await;
        assert_eq!(set.skus(), &["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn test_same_sku_is_exclusive() {
        let registry = Arc::new(SkuLockRegistry::new());
        let held = registry.acquire(["SKU-A"]).await;

        let r = registry.clone();
        let waiter = tokio::spawn(async move {
            let _set = r.acquire(["SKU-A"]).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_released_skus_are_evicted() {
        let registry = SkuLockRegistry::new();
        let set = registry.acquire(["SKU-A", "SKU-B"]).await;
        assert_eq!(registry.tracked(), 2);

        drop(set);
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn test_waited_on_sku_survives_release() {
        let registry = Arc::new(SkuLockRegistry::new());
        let held = registry.acquire(["SKU-A"]).await;

        let r = registry.clone();
        let waiter = tokio::spawn(async move {
            let _set = r.acquire(["SKU-A"]).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);
        // 等待者仍持有同一把锁，条目不能被回收
        assert_eq!(registry.tracked(), 1);

        waiter.await.unwrap();
        assert_eq!(registry.tracked(), 0);
    }

    #[tokio::test]
    async fn test_disjoint_skus_do_not_block() {
        let registry = SkuLockRegistry::new();
        let _a = registry.acquire(["SKU-A"]).await;
        let b = tokio::time::timeout(Duration::from_millis(200), registry.acquire(["SKU-B"])).await;
        assert!(b.is_ok());
    }
}
