//! Tenant realm provisioning.
//!
//! Every replica of a tenant runs the same check-then-create sequence at
//! startup. The sequence runs under a distributed lock named after the
//! functional area, so at most one replica creates the realm and the others
//! observe it as already present.

use std::sync::Arc;

use dc_microservice::{DistributedLock, LockConfig, with_lock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use user_management_sdk::TenantIdentity;

use super::error::ProvisioningError;
use super::session::SessionTokenHolder;
use super::state::{ProvisioningOutcome, ProvisioningReport, ProvisioningState, StateTrace};

pub struct TenantRealmProvisioner {
    session: Arc<SessionTokenHolder>,
    lock: Arc<dyn DistributedLock>,
    lock_name: String,
    lock_config: LockConfig,
}

impl TenantRealmProvisioner {
    #[must_use]
    pub fn new(
        session: Arc<SessionTokenHolder>,
        lock: Arc<dyn DistributedLock>,
        lock_name: impl Into<String>,
        lock_config: LockConfig,
    ) -> Self {
        Self {
            session,
            lock,
            lock_name: lock_name.into(),
            lock_config,
        }
    }

    #[must_use]
    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Ensure the realm of `identity` exists, creating it if absent.
    ///
    /// Requires an established admin session. The lock is released on every
    /// exit path except cancellation, where it is left to lease expiry.
    ///
    /// # Errors
    /// - [`ProvisioningError::LockTimeout`] when the lock budget is exhausted
    /// - [`ProvisioningError::RealmLookup`] when the lookup fails (no create is attempted)
    /// - [`ProvisioningError::Creation`] when the realm cannot be created
    /// - [`ProvisioningError::LeaseExpired`] when lookup and create outlive the lock lease
    /// - [`ProvisioningError::SessionUnavailable`] without a prior login
    /// - [`ProvisioningError::Cancelled`] when `cancel` fires
    #[tracing::instrument(skip_all, fields(realm = %identity.realm_key(), lock = %self.lock_name))]
    pub async fn verify_tenant_realm(
        &self,
        identity: &TenantIdentity,
        cancel: &CancellationToken,
    ) -> Result<ProvisioningReport, ProvisioningError> {
        let mut trace = StateTrace::new(identity.realm_key());
        trace.enter(ProvisioningState::LockRequested);

        let result = {
            let trace = &mut trace;
            with_lock(
                self.lock.as_ref(),
                &self.lock_name,
                &self.lock_config,
                cancel,
                || async move {
                    trace.enter(ProvisioningState::LockAcquired);
                    self.check_then_create(identity, trace, cancel).await
                },
            )
            .await
        };

        match result {
            Ok(outcome) => {
                let report = trace.into_report(outcome);
                info!(outcome = ?report.outcome, "tenant realm verified");
                Ok(report)
            }
            Err(e) => {
                match &e {
                    ProvisioningError::LockTimeout { .. } => {
                        trace.enter(ProvisioningState::LockTimeout);
                    }
                    ProvisioningError::Cancelled
                        if trace.current() != ProvisioningState::Cancelled =>
                    {
                        trace.enter(ProvisioningState::Cancelled);
                    }
                    _ => {}
                }
                trace.enter(ProvisioningState::Failed);
                error!(
                    kind = e.kind(),
                    error = %e,
                    states = ?trace.states(),
                    "tenant realm verification failed"
                );
                Err(e)
            }
        }
    }

    async fn check_then_create(
        &self,
        identity: &TenantIdentity,
        trace: &mut StateTrace,
        cancel: &CancellationToken,
    ) -> Result<ProvisioningOutcome, ProvisioningError> {
        let key = identity.realm_key();
        let session = self.session.current()?;
        let iam = self.session.client();

        trace.enter(ProvisioningState::Verifying);
        let lookup = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                trace.enter(ProvisioningState::Cancelled);
                return Err(ProvisioningError::Cancelled);
            }
            res = iam.get_realm(&session, key.as_str()) => res,
        };

        match lookup {
            Ok(Some(existing)) => {
                trace.enter(ProvisioningState::Found);
                info!(enabled = existing.enabled, "tenant realm already exists");
                Ok(ProvisioningOutcome::Found)
            }
            Ok(None) => {
                trace.enter(ProvisioningState::NotFound);
                info!("tenant realm not found, creating it");

                let record = identity.realm_record();
                trace.enter(ProvisioningState::Creating);
                let created = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        trace.enter(ProvisioningState::Cancelled);
                        return Err(ProvisioningError::Cancelled);
                    }
                    res = iam.create_realm(&session, &record) => res,
                };

                match created {
                    Ok(()) => {
                        trace.enter(ProvisioningState::Created);
                        info!(display_name = %record.display_name, "tenant realm created");
                        Ok(ProvisioningOutcome::Created)
                    }
                    Err(source) => {
                        trace.enter(ProvisioningState::CreateFailed);
                        Err(ProvisioningError::Creation {
                            realm: key.to_string(),
                            source,
                        })
                    }
                }
            }
            Err(source) => {
                trace.enter(ProvisioningState::LookupFailed);
                Err(ProvisioningError::RealmLookup {
                    realm: key.to_string(),
                    source,
                })
            }
        }
    }
}
