use async_trait::async_trait;

use crate::error::IamError;
use crate::models::{AdminCredentials, AdminSession, RealmRecord};

/// Administrative API of an identity provider.
///
/// Implementations perform exactly one remote call per method and never
/// retry; retry and serialization policy belong to the caller.
#[async_trait]
pub trait IamAdminClient: Send + Sync {
    /// Obtain an administrative session by password grant against `realm`.
    async fn login(
        &self,
        credentials: &AdminCredentials,
        realm: &str,
    ) -> Result<AdminSession, IamError>;

    /// Look up a realm by key.
    ///
    /// # Returns
    /// * `Ok(Some(_))` - the realm exists
    /// * `Ok(None)` - the provider reported that no such realm exists
    /// * `Err(_)` - the lookup itself failed; existence is unknown
    async fn get_realm(
        &self,
        session: &AdminSession,
        realm: &str,
    ) -> Result<Option<RealmRecord>, IamError>;

    /// Create a realm from `record`.
    async fn create_realm(&self, session: &AdminSession, record: &RealmRecord)
    -> Result<(), IamError>;
}
