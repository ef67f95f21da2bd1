use std::time::Duration;

use dc_microservice::LockError;
use thiserror::Error;
use user_management_sdk::IamError;

/// Failure of a tenant realm provisioning attempt. Every variant aborts
/// component initialization.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Administrative login was rejected or failed.
    #[error("keycloak admin login failed: {0}")]
    Auth(#[source] IamError),

    /// The provisioning lock could not be acquired within its attempt budget.
    #[error("timed out acquiring lock '{lock}' after {attempts} attempts")]
    LockTimeout { lock: String, attempts: u32 },

    /// Realm lookup failed for a reason other than absence.
    #[error("failed to look up realm '{realm}': {source}")]
    RealmLookup {
        realm: String,
        #[source]
        source: IamError,
    },

    #[error("failed to create realm '{realm}': {source}")]
    Creation {
        realm: String,
        #[source]
        source: IamError,
    },

    /// The check-then-create section did not finish within the lock lease.
    #[error("provisioning under lock '{lock}' outlived its {lease:?} lease")]
    LeaseExpired { lock: String, lease: Duration },

    /// Lock backend failure other than a timeout.
    #[error("lock backend failure: {0}")]
    Lock(#[source] LockError),

    /// No administrative session has been established yet.
    #[error("no keycloak admin session available")]
    SessionUnavailable,

    #[error("realm provisioning was cancelled")]
    Cancelled,
}

impl From<LockError> for ProvisioningError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { name, attempts } => ProvisioningError::LockTimeout {
                lock: name,
                attempts,
            },
            LockError::Cancelled { .. } => ProvisioningError::Cancelled,
            LockError::LeaseExpired { name, lease } => {
                ProvisioningError::LeaseExpired { lock: name, lease }
            }
            other => ProvisioningError::Lock(other),
        }
    }
}

impl ProvisioningError {
    /// Stable short name of the failure kind, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisioningError::Auth(_) => "auth",
            ProvisioningError::LockTimeout { .. } => "lock_timeout",
            ProvisioningError::RealmLookup { .. } => "realm_lookup",
            ProvisioningError::Creation { .. } => "creation",
            ProvisioningError::LeaseExpired { .. } => "lease_expired",
            ProvisioningError::Lock(_) => "lock",
            ProvisioningError::SessionUnavailable => "session_unavailable",
            ProvisioningError::Cancelled => "cancelled",
        }
    }
}
