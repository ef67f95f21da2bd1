//! User management configuration (`modules.user_management.config`).

use std::time::Duration;

use dc_microservice::{ConfigError, KeycloakInfrastructure, LockConfig, SecretString};
use keycloak_plugin::KeycloakEndpoint;
use serde::{Deserialize, Serialize};
use user_management_sdk::AdminCredentials;

/// Key of this module under `modules` in the application config.
pub const MODULE_NAME: &str = "user_management";

/// Placeholder section kept for compatibility with generated configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NestedConfiguration {
    pub test: String,
}

impl Default for NestedConfiguration {
    fn default() -> Self {
        Self {
            test: "test".to_owned(),
        }
    }
}

/// Keycloak connection settings. The hostname comes from
/// `infrastructure.keycloak.hostname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeycloakSettings {
    pub scheme: String,
    pub port: u16,
    pub admin_username: String,
    pub admin_password: SecretString,
    /// Realm the admin user logs in to.
    pub master_realm: String,
    #[serde(with = "dc_microservice::humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for KeycloakSettings {
    fn default() -> Self {
        let endpoint = KeycloakEndpoint::default();
        Self {
            scheme: endpoint.scheme,
            port: endpoint.port,
            admin_username: "devicechain".to_owned(),
            admin_password: SecretString::new("devicechain"),
            master_realm: "master".to_owned(),
            request_timeout: endpoint.request_timeout,
        }
    }
}

impl KeycloakSettings {
    #[must_use]
    pub fn endpoint(&self, infra: &KeycloakInfrastructure) -> KeycloakEndpoint {
        KeycloakEndpoint {
            scheme: self.scheme.clone(),
            hostname: infra.hostname.clone(),
            port: self.port,
            request_timeout: self.request_timeout,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
        }
    }
}

/// Default configuration document of the user-management functional area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserManagementConfiguration {
    pub nested: NestedConfiguration,
    pub keycloak: KeycloakSettings,
    /// Lock policy for realm verification.
    pub provisioning: LockConfig,
}

impl UserManagementConfiguration {
    /// Realm verification issues at most two Keycloak requests under the lock,
    /// so both must fit in the lease with room to spare.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] when two request timeouts reach the lease.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let worst_case = self.keycloak.request_timeout.saturating_mul(2);
        if worst_case >= self.provisioning.lease {
            return Err(ConfigError::Invalid {
                module: MODULE_NAME.to_owned(),
                message: format!(
                    "keycloak.request_timeout ({:?}) must be less than half of provisioning.lease ({:?})",
                    self.keycloak.request_timeout, self.provisioning.lease
                ),
            });
        }
        Ok(())
    }
}
