#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Common test utilities for user-management integration tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dc_microservice::{DistributedLock, InMemoryLock, LockConfig, MicroserviceContext};
use parking_lot::Mutex;
use user_management::{
    AdminCredentials, AdminSession, IamAdminClient, IamError, RealmRecord, SessionTokenHolder,
    TenantIdentity, TenantRealmProvisioner, UserManagementConfiguration,
};

/// In-memory identity provider that counts calls and can inject failures.
#[derive(Default)]
pub struct FakeIam {
    realms: Mutex<HashMap<String, RealmRecord>>,
    logins: AtomicUsize,
    lookups: AtomicUsize,
    creates: AtomicUsize,
    fail_login: AtomicBool,
    lookup_error: Mutex<Option<IamError>>,
    create_failures: AtomicUsize,
    lookup_delay: Mutex<Duration>,
    session_ttl: Mutex<Option<Duration>>,
    next_create_delay: Mutex<Option<Duration>>,
    creates_in_flight: AtomicUsize,
    max_creates_in_flight: AtomicUsize,
}

/// Marks one create call in flight until dropped, including when the caller
/// abandons the request.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeIam {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn realm(&self, key: &str) -> Option<RealmRecord> {
        self.realms.lock().get(key).cloned()
    }

    pub fn realm_count(&self) -> usize {
        self.realms.lock().len()
    }

    pub fn fail_login(&self, fail: bool) {
        self.fail_login.store(fail, Ordering::SeqCst);
    }

    /// Every lookup fails with `err` until cleared with `None`.
    pub fn fail_lookups_with(&self, err: Option<IamError>) {
        *self.lookup_error.lock() = err;
    }

    /// The next `n` creates fail with a 500.
    pub fn fail_next_creates(&self, n: usize) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// Widen the check-then-create window.
    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock() = delay;
    }

    /// Lifetime reported for sessions issued from now on (60s when unset).
    pub fn issue_sessions_for(&self, ttl: Duration) {
        *self.session_ttl.lock() = Some(ttl);
    }

    /// Only the next create stalls for `delay` before writing.
    pub fn delay_next_create(&self, delay: Duration) {
        *self.next_create_delay.lock() = Some(delay);
    }

    /// Highest number of create calls seen in flight at once.
    pub fn max_creates_in_flight(&self) -> usize {
        self.max_creates_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IamAdminClient for FakeIam {
    async fn login(
        &self,
        credentials: &AdminCredentials,
        _realm: &str,
    ) -> Result<AdminSession, IamError> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(IamError::Unauthorized {
                status: 401,
                message: format!("login for {} rejected", credentials.username),
            });
        }
        let ttl = (*self.session_ttl.lock()).unwrap_or(Duration::from_secs(60));
        Ok(AdminSession::new(format!("token-{n}"), ttl))
    }

    async fn get_realm(
        &self,
        _session: &AdminSession,
        realm: &str,
    ) -> Result<Option<RealmRecord>, IamError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = *self.lookup_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.lookup_error.lock().clone() {
            return Err(err);
        }
        Ok(self.realms.lock().get(realm).cloned())
    }

    async fn create_realm(
        &self,
        _session: &AdminSession,
        record: &RealmRecord,
    ) -> Result<(), IamError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let now = self.creates_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_creates_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.creates_in_flight);

        let delay = self.next_create_delay.lock().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.create_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.create_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(IamError::Status {
                operation: "create realm",
                status: 500,
                message: "internal error".to_owned(),
            });
        }

        let mut realms = self.realms.lock();
        if realms.contains_key(&record.realm) {
            return Err(IamError::Status {
                operation: "create realm",
                status: 409,
                message: "Conflict detected.".to_owned(),
            });
        }
        realms.insert(record.realm.clone(), record.clone());
        Ok(())
    }
}

pub fn fast_lock_config() -> LockConfig {
    LockConfig {
        lease: Duration::from_secs(3),
        max_attempts: 3,
        retry_interval: Duration::from_millis(20),
        release_timeout: Duration::from_millis(200),
    }
}

pub fn identity(instance: &str, tenant: &str) -> TenantIdentity {
    TenantIdentity::new(instance, tenant, format!("Tenant {tenant}"))
}

pub fn context(instance: &str, tenant: &str) -> MicroserviceContext {
    MicroserviceContext {
        instance_id: instance.to_owned(),
        tenant_id: tenant.to_owned(),
        tenant_name: format!("Tenant {tenant}"),
        functional_area: "user-management".to_owned(),
    }
}

pub fn test_config() -> UserManagementConfiguration {
    UserManagementConfiguration {
        provisioning: fast_lock_config(),
        ..Default::default()
    }
}

/// Session holder that has already logged in against `iam`.
pub async fn logged_in(iam: &Arc<FakeIam>) -> Arc<SessionTokenHolder> {
    let holder = Arc::new(SessionTokenHolder::new(
        iam.clone(),
        AdminCredentials::new("devicechain", "devicechain"),
        "master",
    ));
    holder.refresh().await.unwrap();
    holder
}

pub fn provisioner(
    session: Arc<SessionTokenHolder>,
    lock: Arc<dyn DistributedLock>,
    config: LockConfig,
) -> TenantRealmProvisioner {
    TenantRealmProvisioner::new(session, lock, "user-management", config)
}

pub fn shared_lock() -> Arc<InMemoryLock> {
    Arc::new(InMemoryLock::new())
}
