//! User management microservice.
//!
//! The Keycloak manager is attached to the microservice lifecycle through
//! hooks: it is initialized and started after the microservice itself, and
//! stopped and terminated before it.

use std::sync::Arc;

use async_trait::async_trait;
use dc_microservice::{
    AppConfig, DistributedLock, LifecycleCallback, LifecycleCallbacks, LifecycleComponent,
    LifecycleError, LifecycleManager, ManagedComponent, MicroserviceContext,
};
use keycloak_plugin::KeycloakAdminClient;
use tokio_util::sync::CancellationToken;
use tracing::info;
use user_management_sdk::{IamAdminClient, TenantIdentity};

use crate::config::{MODULE_NAME, UserManagementConfiguration};
use crate::domain::{SessionTokenHolder, TenantRealmProvisioner};
use crate::manager::{KeycloakManager, KeycloakManagerDeps};
use crate::resolver::ResolverDeps;

struct MicroserviceBody {
    context: MicroserviceContext,
}

#[async_trait]
impl LifecycleComponent for MicroserviceBody {
    async fn execute_initialize(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        info!(
            instance_id = %self.context.instance_id,
            tenant_id = %self.context.tenant_id,
            functional_area = %self.context.functional_area,
            "microservice initialized"
        );
        Ok(())
    }

    async fn execute_start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        info!(functional_area = %self.context.functional_area, "microservice started");
        Ok(())
    }

    async fn execute_stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        info!(functional_area = %self.context.functional_area, "microservice stopped");
        Ok(())
    }

    async fn execute_terminate(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        info!(functional_area = %self.context.functional_area, "microservice terminated");
        Ok(())
    }
}

pub struct UserManagementMicroservice {
    body: MicroserviceBody,
    keycloak: Arc<KeycloakManager>,
    lifecycle: LifecycleManager,
}

impl UserManagementMicroservice {
    /// Build from the application config, talking to Keycloak over HTTP.
    ///
    /// # Errors
    /// Fails if the module section is invalid or the Keycloak endpoint is unusable.
    pub fn from_config(app: &AppConfig, lock: Arc<dyn DistributedLock>) -> anyhow::Result<Self> {
        let config: UserManagementConfiguration = app.module_config_or_default(MODULE_NAME)?;
        config.validate()?;
        let endpoint = config.keycloak.endpoint(&app.infrastructure.keycloak);
        info!(url = %endpoint.base_url()?, "using keycloak");

        let iam: Arc<dyn IamAdminClient> = Arc::new(KeycloakAdminClient::new(&endpoint)?);
        Ok(Self::new(app.microservice.clone(), iam, lock, &config))
    }

    #[must_use]
    pub fn new(
        context: MicroserviceContext,
        iam: Arc<dyn IamAdminClient>,
        lock: Arc<dyn DistributedLock>,
        config: &UserManagementConfiguration,
    ) -> Self {
        let session = Arc::new(SessionTokenHolder::new(
            iam,
            config.keycloak.credentials(),
            config.keycloak.master_realm.clone(),
        ));
        let provisioner = Arc::new(TenantRealmProvisioner::new(
            session.clone(),
            lock,
            context.functional_area.clone(),
            config.provisioning,
        ));
        let keycloak = Arc::new(KeycloakManager::new(KeycloakManagerDeps {
            name: context.component_name("keycloak"),
            identity: TenantIdentity::from(&context),
            session,
            provisioner,
            callbacks: LifecycleCallbacks::no_op(),
        }));

        let lifecycle =
            LifecycleManager::new(context.functional_area.clone(), keycloak_hooks(&keycloak));

        Self {
            body: MicroserviceBody { context },
            keycloak,
            lifecycle,
        }
    }

    #[must_use]
    pub fn keycloak(&self) -> &Arc<KeycloakManager> {
        &self.keycloak
    }

    #[must_use]
    pub fn resolver_deps(&self) -> ResolverDeps {
        ResolverDeps {
            keycloak: self.keycloak.clone(),
        }
    }
}

fn keycloak_hooks(keycloak: &Arc<KeycloakManager>) -> LifecycleCallbacks {
    let init = keycloak.clone();
    let start = keycloak.clone();
    let stop = keycloak.clone();
    let term = keycloak.clone();

    LifecycleCallbacks {
        initializer: LifecycleCallback::after(move |cancel| {
            let km = init.clone();
            async move { km.initialize(cancel).await.map_err(anyhow::Error::from) }
        }),
        starter: LifecycleCallback::after(move |cancel| {
            let km = start.clone();
            async move { km.start(cancel).await.map_err(anyhow::Error::from) }
        }),
        stopper: LifecycleCallback::before(move |cancel| {
            let km = stop.clone();
            async move { km.stop(cancel).await.map_err(anyhow::Error::from) }
        }),
        terminator: LifecycleCallback::before(move |cancel| {
            let km = term.clone();
            async move { km.terminate(cancel).await.map_err(anyhow::Error::from) }
        }),
    }
}

#[async_trait]
impl ManagedComponent for UserManagementMicroservice {
    fn name(&self) -> &str {
        self.lifecycle.name()
    }

    async fn initialize(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.initialize(&self.body, cancel).await
    }

    async fn start(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.start(&self.body, cancel).await
    }

    async fn stop(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.stop(&self.body, cancel).await
    }

    async fn terminate(&self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        self.lifecycle.terminate(&self.body, cancel).await
    }
}
