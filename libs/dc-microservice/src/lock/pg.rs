//! PostgreSQL lease-table backend.
//!
//! Every replica of a functional area points at the same database; a row in
//! `dc_distributed_locks` is the lease. An expired row can be overwritten by
//! any contender in a single statement, so there is no separate reaper.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{DistributedLock, LockError, LockHandle};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS dc_distributed_locks (
    name TEXT PRIMARY KEY,
    token UUID NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL
)";

const ACQUIRE: &str = "INSERT INTO dc_distributed_locks (name, token, expires_at)
VALUES ($1, $2, now() + make_interval(secs => $3))
ON CONFLICT (name) DO UPDATE
    SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
    WHERE dc_distributed_locks.expires_at <= now()
RETURNING token";

const RELEASE: &str = "DELETE FROM dc_distributed_locks WHERE name = $1 AND token = $2";

fn backend(e: &sqlx::Error) -> LockError {
    LockError::Backend(e.to_string())
}

#[derive(Debug, Clone)]
pub struct PgLeaseLock {
    pool: PgPool,
}

impl PgLeaseLock {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `dsn` and make sure the lease table exists.
    ///
    /// # Errors
    /// Returns [`LockError::Backend`] if the connection or DDL fails.
    pub async fn connect(dsn: &str) -> Result<Self, LockError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(dsn)
            .await
            .map_err(|e| backend(&e))?;
        let lock = Self::new(pool);
        lock.ensure_schema().await?;
        Ok(lock)
    }

    /// Create the lease table if it does not exist yet.
    ///
    /// # Errors
    /// Returns [`LockError::Backend`] if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), LockError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| backend(&e))?;
        Ok(())
    }
}

#[async_trait]
impl DistributedLock for PgLeaseLock {
    async fn try_acquire(
        &self,
        name: &str,
        lease: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        let token = Uuid::new_v4();
        let granted: Option<(Uuid,)> = sqlx::query_as(ACQUIRE)
            .bind(name)
            .bind(token)
            .bind(lease.as_secs_f64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend(&e))?;

        Ok(granted
            .filter(|(t,)| *t == token)
            .map(|_| LockHandle::new(name, token, lease)))
    }

    async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let done = sqlx::query(RELEASE)
            .bind(handle.name())
            .bind(handle.token())
            .execute(&self.pool)
            .await
            .map_err(|e| backend(&e))?;

        if done.rows_affected() == 0 {
            return Err(LockError::NotHeld {
                name: handle.name().to_owned(),
            });
        }
        Ok(())
    }
}
