//! Lease-based distributed mutual exclusion.
//!
//! A [`DistributedLock`] backend grants a named lease to at most one holder at
//! a time. The lease expires on its own, so a crashed or cancelled holder
//! never blocks the fleet for longer than [`LockConfig::lease`].
//!
//! [`with_lock`] is the consumer-side entry point: acquire with a bounded
//! number of attempts, run the critical section, release on every exit path.
//! The section itself is bounded by the lease: once the lease runs out another
//! holder may be granted the lock, so a section still running is abandoned.
//!
//! ```ignore
//! let lock = InMemoryLock::new();
//! let cfg = LockConfig::default();
//! let value = with_lock(&lock, "user-management", &cfg, &cancel, || async {
//!     Ok::<_, LockError>(42)
//! })
//! .await?;
//! ```
//!
//! Cancellation: a cancelled wait returns [`LockError::Cancelled`]. When the
//! token fires while the critical section runs, no release is attempted and
//! the lease is left to expire.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "pg")]
pub mod pg;

pub use memory::InMemoryLock;
#[cfg(feature = "pg")]
pub use pg::PgLeaseLock;

/// Acquisition policy for a distributed lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// How long a granted lease stays valid without release.
    #[serde(with = "crate::humantime_serde")]
    pub lease: Duration,

    /// Number of acquisition attempts before giving up.
    pub max_attempts: u32,

    /// Pause between two acquisition attempts.
    #[serde(with = "crate::humantime_serde")]
    pub retry_interval: Duration,

    /// Upper bound for the release call after the critical section.
    #[serde(with = "crate::humantime_serde")]
    pub release_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(3),
            max_attempts: 3,
            retry_interval: Duration::from_secs(1),
            release_timeout: Duration::from_secs(2),
        }
    }
}

/// Proof of ownership of a named lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    name: String,
    token: Uuid,
    lease: Duration,
}

impl LockHandle {
    #[must_use]
    pub fn new(name: impl Into<String>, token: Uuid, lease: Duration) -> Self {
        Self {
            name: name.into(),
            token,
            lease,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn token(&self) -> Uuid {
        self.token
    }

    #[must_use]
    pub fn lease(&self) -> Duration {
        self.lease
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock '{name}' not acquired after {attempts} attempts")]
    Timeout { name: String, attempts: u32 },

    #[error("wait for lock '{name}' was cancelled")]
    Cancelled { name: String },

    #[error("lock '{name}' is not held by this handle")]
    NotHeld { name: String },

    #[error("critical section under lock '{name}' outlived its {lease:?} lease")]
    LeaseExpired { name: String, lease: Duration },

    #[error("lock backend error: {0}")]
    Backend(String),
}

/// Backend granting named leases.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Single acquisition attempt. `Ok(None)` means another holder owns a live lease.
    async fn try_acquire(&self, name: &str, lease: Duration)
    -> Result<Option<LockHandle>, LockError>;

    /// Release a lease previously granted to `handle`.
    async fn release(&self, handle: &LockHandle) -> Result<(), LockError>;

    /// Acquire `name`, retrying up to `config.max_attempts` times.
    ///
    /// # Errors
    /// [`LockError::Timeout`] when the attempt budget is exhausted,
    /// [`LockError::Cancelled`] when `cancel` fires first, or a backend error.
    async fn acquire(
        &self,
        name: &str,
        config: &LockConfig,
        cancel: &CancellationToken,
    ) -> Result<LockHandle, LockError> {
        let attempts = config.max_attempts.max(1);
        for attempt in 1..=attempts {
            let granted = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(LockError::Cancelled { name: name.to_owned() });
                }
                res = self.try_acquire(name, config.lease) => res?,
            };
            if let Some(handle) = granted {
                tracing::debug!(lock = name, attempt, "lock acquired");
                return Ok(handle);
            }

            tracing::debug!(lock = name, attempt, max_attempts = attempts, "lock busy");
            if attempt < attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return Err(LockError::Cancelled { name: name.to_owned() });
                    }
                    () = tokio::time::sleep(config.retry_interval) => {}
                }
            }
        }

        Err(LockError::Timeout {
            name: name.to_owned(),
            attempts,
        })
    }
}

/// Run `critical_section` while holding the lock `name`.
///
/// The lock is released after the section returns, whether it succeeded or
/// failed. Release is bounded by [`LockConfig::release_timeout`]; a failed or
/// late release is logged and left to lease expiry.
///
/// The section must finish within [`LockConfig::lease`]. A section still
/// running when the lease lapses is dropped and no release is attempted, since
/// the lease may already belong to someone else.
///
/// # Errors
/// Acquisition failures and [`LockError::LeaseExpired`] are converted into
/// `E`; otherwise the section's own result is returned unchanged.
pub async fn with_lock<T, E, F, Fut>(
    lock: &dyn DistributedLock,
    name: &str,
    config: &LockConfig,
    cancel: &CancellationToken,
    critical_section: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<LockError>,
{
    let handle = lock.acquire(name, config, cancel).await?;

    let Ok(result) = tokio::time::timeout(config.lease, critical_section()).await else {
        tracing::warn!(
            lock = name,
            lease = ?handle.lease(),
            "critical section outlived the lease; abandoned without release"
        );
        return Err(LockError::LeaseExpired {
            name: name.to_owned(),
            lease: handle.lease(),
        }
        .into());
    };

    if cancel.is_cancelled() {
        tracing::warn!(
            lock = name,
            lease = ?handle.lease(),
            "cancelled while holding lock; leaving it to lease expiry"
        );
        return result;
    }

    match tokio::time::timeout(config.release_timeout, lock.release(&handle)).await {
        Ok(Ok(())) => tracing::debug!(lock = name, "lock released"),
        Ok(Err(e)) => {
            tracing::warn!(lock = name, error = %e, "lock release failed; lease will expire");
        }
        Err(_) => {
            tracing::warn!(
                lock = name,
                timeout = ?config.release_timeout,
                "lock release timed out; lease will expire"
            );
        }
    }

    result
}
