use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{DistributedLock, LockError, LockHandle};

#[derive(Debug)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

/// Process-local lease table.
///
/// Grants mutual exclusion between tasks of one process only. Suitable for a
/// single replica and for tests; a fleet needs a shared backend such as
/// `PgLeaseLock`.
#[derive(Debug, Default)]
pub struct InMemoryLock {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is currently held by a live lease.
    #[must_use]
    pub fn is_held(&self, name: &str) -> bool {
        self.leases
            .lock()
            .get(name)
            .is_some_and(|l| l.expires_at > Instant::now())
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn try_acquire(
        &self,
        name: &str,
        lease: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        let now = Instant::now();
        let mut leases = self.leases.lock();

        if leases.get(name).is_some_and(|l| l.expires_at > now) {
            return Ok(None);
        }

        let token = Uuid::new_v4();
        leases.insert(
            name.to_owned(),
            Lease {
                token,
                expires_at: now + lease,
            },
        );
        Ok(Some(LockHandle::new(name, token, lease)))
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let mut leases = self.leases.lock();
        match leases.get(handle.name()) {
            Some(l) if l.token == handle.token() => {
                leases.remove(handle.name());
                Ok(())
            }
            _ => Err(LockError::NotHeld {
                name: handle.name().to_owned(),
            }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(3);

    #[tokio::test]
    async fn second_acquire_is_refused_while_held() {
        let lock = InMemoryLock::new();
        let first = lock.try_acquire("area", LEASE).await.unwrap();
        assert!(first.is_some());
        assert!(lock.try_acquire("area", LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn different_names_do_not_contend() {
        let lock = InMemoryLock::new();
        assert!(lock.try_acquire("a", LEASE).await.unwrap().is_some());
        assert!(lock.try_acquire("b", LEASE).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_lease_can_be_taken_over() {
        let lock = InMemoryLock::new();
        let stale = lock.try_acquire("area", LEASE).await.unwrap().unwrap();

        tokio::time::advance(LEASE + Duration::from_millis(1)).await;
        assert!(!lock.is_held("area"));

        let fresh = lock.try_acquire("area", LEASE).await.unwrap().unwrap();
        assert_ne!(stale.token(), fresh.token());

        // The previous holder lost its lease and cannot release the new one.
        let err = lock.release(&stale).await.unwrap_err();
        assert!(matches!(err, LockError::NotHeld { .. }));
        assert!(lock.is_held("area"));
    }

    #[tokio::test]
    async fn release_frees_the_name() {
        let lock = InMemoryLock::new();
        let h = lock.try_acquire("area", LEASE).await.unwrap().unwrap();
        lock.release(&h).await.unwrap();
        assert!(!lock.is_held("area"));
        assert!(lock.try_acquire("area", LEASE).await.unwrap().is_some());
    }
}
