//! Keycloak lifecycle component.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dc_microservice::{
    LifecycleCallbacks, LifecycleComponent, LifecycleError, LifecycleManager, LifecycleStatus,
    ManagedComponent,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use user_management_sdk::{AdminSession, TenantIdentity};

use crate::domain::{
    ProvisioningError, ProvisioningReport, SessionTokenHolder, TenantRealmProvisioner,
};

/// Collaborators of a [`KeycloakManager`], constructed by the caller.
pub struct KeycloakManagerDeps {
    /// Lifecycle name, `{functional_area}-keycloak`.
    pub name: String,
    pub identity: TenantIdentity,
    pub session: Arc<SessionTokenHolder>,
    pub provisioner: Arc<TenantRealmProvisioner>,
    pub callbacks: LifecycleCallbacks,
}

/// Logs in to Keycloak and verifies the tenant realm during `initialize`.
///
/// `start`, `stop` and `terminate` have no work of their own.
pub struct KeycloakManager {
    identity: TenantIdentity,
    session: Arc<SessionTokenHolder>,
    provisioner: Arc<TenantRealmProvisioner>,
    lifecycle: LifecycleManager,
    last_report: ArcSwapOption<ProvisioningReport>,
}

impl KeycloakManager {
    #[must_use]
    pub fn new(deps: KeycloakManagerDeps) -> Self {
        Self {
            identity: deps.identity,
            session: deps.session,
            provisioner: deps.provisioner,
            lifecycle: LifecycleManager::new(deps.name, deps.callbacks),
            last_report: ArcSwapOption::from(None),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &TenantIdentity {
        &self.identity
    }

    #[must_use]
    pub fn status(&self) -> LifecycleStatus {
        self.lifecycle.status()
    }

    /// Admin session established during initialization.
    ///
    /// # Errors
    /// [`ProvisioningError::SessionUnavailable`] before a successful login.
    pub fn admin_session(&self) -> Result<Arc<AdminSession>, ProvisioningError> {
        self.session.current()
    }

    #[must_use]
    pub fn session_holder(&self) -> &Arc<SessionTokenHolder> {
        &self.session
    }

    /// Report of the last successful realm verification.
    #[must_use]
    pub fn last_report(&self) -> Option<Arc<ProvisioningReport>> {
        self.last_report.load_full()
    }

    async fn login(&self, cancel: &CancellationToken) -> Result<(), ProvisioningError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ProvisioningError::Cancelled),
            res = self.session.refresh() => res.map(|_| ()).map_err(ProvisioningError::Auth),
        }
    }
}

#[async_trait]
impl LifecycleComponent for KeycloakManager {
    #[tracing::instrument(skip_all, fields(component = %self.lifecycle.name()))]
    async fn execute_initialize(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.login(&cancel).await?;

        let report = self
            .provisioner
            .verify_tenant_realm(&self.identity, &cancel)
            .await?;
        info!(
            realm = %report.realm,
            outcome = ?report.outcome,
            "keycloak manager initialized"
        );
        self.last_report.store(Some(Arc::new(report)));
        Ok(())
    }

    async fn execute_start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        debug!(component = %self.lifecycle.name(), "start: nothing to do");
        Ok(())
    }

    async fn execute_stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        debug!(component = %self.lifecycle.name(), "stop: nothing to do");
        Ok(())
    }

    async fn execute_terminate(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        debug!(component = %self.lifecycle.name(), "terminate: nothing to do");
        Ok(())
    }
}

#[async_trait]
impl ManagedComponent for KeycloakManager {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    async fn initialize(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.initialize(self, cancel).await
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.start(self, cancel).await
    }

    async fn stop(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.stop(self, cancel).await
    }

    async fn terminate(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.terminate(self, cancel).await
    }
}
