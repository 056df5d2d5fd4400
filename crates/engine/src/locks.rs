//! Per-child wallet locks.
//!
//! Every read-modify-write of a wallet happens while holding the child's
//! [`WalletGuard`]. The guard is taken before the DB transaction begins, and
//! an operation holds at most one of them, so a task never waits for a lock
//! while it owns a pooled connection.
//!
//! A slot lives only while someone holds or waits for it; the last guard out
//! removes it, so unknown ids never accumulate.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

pub(crate) const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type Slots = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

#[derive(Debug)]
pub(crate) struct WalletLocks {
    slots: Slots,
    timeout: Duration,
}

/// Proof that the holder owns a child's wallet lock.
#[derive(Debug)]
pub(crate) struct WalletGuard {
    child_id: Uuid,
    slots: Slots,
    guard: OwnedMutexGuard<()>,
}

impl WalletGuard {
    pub(crate) fn child_id(&self) -> Uuid {
        self.child_id
    }
}

impl WalletLocks {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    fn slot(&self, child_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(child_id).or_default().clone()
    }

    /// Wait at most the configured timeout for the child's wallet lock.
    pub(crate) async fn acquire(&self, child_id: Uuid) -> ResultEngine<WalletGuard> {
        let slot = self.slot(child_id);
        match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(WalletGuard {
                child_id,
                slots: Arc::clone(&self.slots),
                guard,
            }),
            Err(_) => {
                tracing::warn!(%child_id, "wallet lock not acquired within {:?}", self.timeout);
                Err(EngineError::Contention(format!(
                    "wallet of {child_id} is busy, retry later"
                )))
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for WalletGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference is the map's, one is `guard`'s; any other is a waiter.
        if slots.get(&self.child_id).is_some_and(|slot| {
            Arc::ptr_eq(slot, OwnedMutexGuard::mutex(&self.guard)) && Arc::strong_count(slot) <= 2
        })
        {
            slots.remove(&self.child_id);
        }
    }
}

impl Default for WalletLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_first_is_held() {
        let locks = WalletLocks::new(Duration::from_millis(20));
        let child_id = Uuid::new_v4();

        let held = locks.acquire(child_id).await.unwrap();
        let err = locks.acquire(child_id).await.unwrap_err();
        assert!(err.is_retryable());

        drop(held);
        assert!(locks.acquire(child_id).await.is_ok());
    }

    #[tokio::test]
    async fn different_children_do_not_contend() {
        let locks = WalletLocks::new(Duration::from_millis(20));
        let _a = locks.acquire(Uuid::new_v4()).await.unwrap();
        assert!(locks.acquire(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn released_slots_are_forgotten() {
        let locks = WalletLocks::new(Duration::from_millis(20));
        for _ in 0..10 {
            drop(locks.acquire(Uuid::new_v4()).await.unwrap());
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn slot_survives_while_someone_waits() {
        let locks = Arc::new(WalletLocks::new(Duration::from_secs(5)));
        let child_id = Uuid::new_v4();

        let held = locks.acquire(child_id).await.unwrap();
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(child_id).await.map(|_| ()) })
        };
        // Let the waiter queue up on the held slot.
        while Arc::strong_count(&locks.slot(child_id)) < 4 {
            tokio::task::yield_now().await;
        }
        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(locks.len(), 0);
    }
}
