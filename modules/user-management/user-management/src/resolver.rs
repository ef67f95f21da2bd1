//! Request-side access to the tenant realm.
//!
//! Request resolvers receive their collaborators through [`ResolverDeps`]
//! at construction time instead of looking them up per request.

use std::sync::Arc;

use user_management_sdk::{RealmKey, RealmRecord};

use crate::domain::ProvisioningError;
use crate::manager::KeycloakManager;

/// Typed dependencies of a [`TenantRealmResolver`].
#[derive(Clone)]
pub struct ResolverDeps {
    pub keycloak: Arc<KeycloakManager>,
}

pub struct TenantRealmResolver {
    deps: ResolverDeps,
}

impl TenantRealmResolver {
    #[must_use]
    pub fn new(deps: ResolverDeps) -> Self {
        Self { deps }
    }

    #[must_use]
    pub fn realm_key(&self) -> RealmKey {
        self.deps.keycloak.identity().realm_key()
    }

    /// Current record of the tenant realm, read with the admin session.
    ///
    /// # Errors
    /// [`ProvisioningError::SessionUnavailable`] before initialization, or
    /// [`ProvisioningError::RealmLookup`] if the provider call fails.
    pub async fn tenant_realm(&self) -> Result<Option<RealmRecord>, ProvisioningError> {
        let key = self.realm_key();
        let holder = self.deps.keycloak.session_holder();
        let session = holder.current()?;
        holder
            .client()
            .get_realm(&session, key.as_str())
            .await
            .map_err(|source| ProvisioningError::RealmLookup {
                realm: key.to_string(),
                source,
            })
    }
}
