#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(all(feature = "integration", feature = "pg"))]

//! Lease table semantics against a real PostgreSQL

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use dc_microservice::lock::PgLeaseLock;
use dc_microservice::{DistributedLock, LockConfig, LockError, with_lock};
use tokio_util::sync::CancellationToken;

const LEASE: Duration = Duration::from_secs(30);

#[tokio::test]
async fn second_acquire_is_refused_while_lease_is_live() -> Result<()> {
    let dut = common::bring_up_postgres().await?;
    let replica_a = PgLeaseLock::connect(&dut.url).await?;
    let replica_b = PgLeaseLock::connect(&dut.url).await?;

    let held = replica_a
        .try_acquire("user-management", LEASE)
        .await?
        .expect("free lock must be granted");
    assert_eq!(held.name(), "user-management");

    assert!(replica_b.try_acquire("user-management", LEASE).await?.is_none());
    assert!(replica_a.try_acquire("user-management", LEASE).await?.is_none());
    assert!(
        replica_b.try_acquire("other-area", LEASE).await?.is_some(),
        "leases are per name"
    );

    replica_a.release(&held).await?;
    assert!(replica_b.try_acquire("user-management", LEASE).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn expired_lease_is_taken_over_and_stale_release_is_refused() -> Result<()> {
    let dut = common::bring_up_postgres().await?;
    let replica_a = PgLeaseLock::connect(&dut.url).await?;
    let replica_b = PgLeaseLock::connect(&dut.url).await?;

    let stale = replica_a
        .try_acquire("user-management", Duration::from_millis(200))
        .await?
        .expect("free lock must be granted");

    tokio::time::sleep(Duration::from_millis(500)).await;

    let fresh = replica_b
        .try_acquire("user-management", LEASE)
        .await?
        .expect("expired lease must be taken over");
    assert_ne!(fresh.token(), stale.token());

    let err = replica_a.release(&stale).await.unwrap_err();
    assert!(matches!(err, LockError::NotHeld { ref name } if name == "user-management"));

    assert!(
        replica_a.try_acquire("user-management", LEASE).await?.is_none(),
        "stale release must not free the new holder's lease"
    );
    replica_b.release(&fresh).await?;
    Ok(())
}

#[tokio::test]
async fn with_lock_serializes_contending_replicas() -> Result<()> {
    let dut = common::bring_up_postgres().await?;
    let inside = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let config = LockConfig {
        lease: Duration::from_secs(10),
        max_attempts: 200,
        retry_interval: Duration::from_millis(20),
        release_timeout: Duration::from_secs(2),
    };

    let mut replicas = Vec::new();
    for _ in 0..2 {
        let lock = PgLeaseLock::connect(&dut.url).await?;
        let inside = inside.clone();
        let max_seen = max_seen.clone();
        replicas.push(tokio::spawn(async move {
            with_lock(&lock, "user-management", &config, &CancellationToken::new(), || async {
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, LockError>(())
            })
            .await
        }));
    }
    for r in replicas {
        r.await??;
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    Ok(())
}
