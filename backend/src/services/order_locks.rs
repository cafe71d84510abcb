//! Per-order exclusive locks
//!
//! Transitions on the same purchase order are serialized; different orders
//! never wait on each other. An order's entry lives only while someone holds
//! or waits for its lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Registry = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// Registry of one async mutex per order id
#[derive(Clone, Default)]
pub struct OrderLocks {
    locks: Registry,
}

/// Exclusive access to one order; the registry entry is dropped with the
/// last guard or waiter
pub struct OrderGuard {
    guard: Option<OwnedMutexGuard<()>>,
    order_id: Uuid,
    locks: Registry,
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        evict_if_idle(&self.locks, self.order_id);
    }
}

fn evict_if_idle(locks: &Registry, order_id: Uuid) {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    // The registry's own handle is the only one left
    if locks
        .get(&order_id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        locks.remove(&order_id);
    }
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, order_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(order_id).or_default().clone()
    }

    fn wrap(&self, order_id: Uuid, guard: OwnedMutexGuard<()>) -> OrderGuard {
        OrderGuard {
            guard: Some(guard),
            order_id,
            locks: self.locks.clone(),
        }
    }

    /// Wait for exclusive access to an order; released when the guard drops
    pub async fn acquire(&self, order_id: Uuid) -> OrderGuard {
        let guard = self.lock_for(order_id).lock_owned().await;
        self.wrap(order_id, guard)
    }

    /// Exclusive access without waiting, if nobody holds the order
    pub fn try_acquire(&self, order_id: Uuid) -> Option<OrderGuard> {
        match self.lock_for(order_id).try_lock_owned() {
            Ok(guard) => Some(self.wrap(order_id, guard)),
            Err(_) => {
                evict_if_idle(&self.locks, order_id);
                None
            }
        }
    }

    /// Number of orders currently held or waited on
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_order_is_exclusive() {
        let locks = OrderLocks::new();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        assert!(locks.try_acquire(id).is_none());
        drop(guard);
        assert!(locks.try_acquire(id).is_some());
    }

    #[tokio::test]
    async fn test_different_orders_are_independent() {
        let locks = OrderLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        assert!(locks.try_acquire(Uuid::new_v4()).is_some());
    }

    #[tokio::test]
    async fn test_released_locks_leave_the_registry() {
        let locks = OrderLocks::new();
        for _ in 0..1000 {
            let guard = locks.acquire(Uuid::new_v4()).await;
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert!(locks.is_empty());

        let id = Uuid::new_v4();
        let held = locks.acquire(id).await;
        assert!(locks.try_acquire(id).is_none());
        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_entry_survives_while_a_waiter_is_queued() {
        let locks = OrderLocks::new();
        let id = Uuid::new_v4();
        let held = locks.acquire(id).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(held);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
