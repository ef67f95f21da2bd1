use std::fmt;
use std::time::{Duration, Instant};

use dc_microservice::{MicroserviceContext, SecretString};
use serde::{Deserialize, Serialize};

/// Identity of the tenant whose realm is provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantIdentity {
    pub instance_id: String,
    pub tenant_id: String,
    pub tenant_name: String,
}

impl TenantIdentity {
    #[must_use]
    pub fn new(
        instance_id: impl Into<String>,
        tenant_id: impl Into<String>,
        tenant_name: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            tenant_id: tenant_id.into(),
            tenant_name: tenant_name.into(),
        }
    }

    /// Realm key shared by every replica of this tenant: `{instance_id}-{tenant_id}`.
    #[must_use]
    pub fn realm_key(&self) -> RealmKey {
        RealmKey(format!("{}-{}", self.instance_id, self.tenant_id))
    }

    #[must_use]
    pub fn realm_display_name(&self) -> String {
        format!("Instance {} - Tenant {}", self.instance_id, self.tenant_name)
    }

    /// Realm representation to create when none exists yet.
    #[must_use]
    pub fn realm_record(&self) -> RealmRecord {
        let key = self.realm_key();
        RealmRecord {
            id: key.0.clone(),
            realm: key.0,
            display_name: self.realm_display_name(),
            enabled: true,
        }
    }
}

impl From<&MicroserviceContext> for TenantIdentity {
    fn from(ctx: &MicroserviceContext) -> Self {
        Self::new(&ctx.instance_id, &ctx.tenant_id, &ctx.tenant_name)
    }
}

/// Realm name derived from a tenant identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RealmKey(String);

impl RealmKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RealmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Realm as exchanged with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRecord {
    #[serde(default)]
    pub id: String,
    pub realm: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: SecretString,
}

impl AdminCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password),
        }
    }
}

/// Administrative session obtained from a login.
#[derive(Debug, Clone)]
pub struct AdminSession {
    access_token: SecretString,
    expires_in: Duration,
    obtained_at: Instant,
}

impl AdminSession {
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            access_token: SecretString::new(access_token),
            expires_in,
            obtained_at: Instant::now(),
        }
    }

    /// Bearer token for admin calls. Never log it.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose()
    }

    #[must_use]
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.obtained_at.elapsed() >= self.expires_in
    }
}
