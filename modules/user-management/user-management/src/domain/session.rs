use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use user_management_sdk::{AdminCredentials, AdminSession, IamAdminClient, IamError};

use super::error::ProvisioningError;

/// Holds the current Keycloak administrative session.
///
/// Reads are lock-free loads from an `ArcSwapOption`; [`refresh`](Self::refresh)
/// replaces the session wholesale, so a concurrent reader sees either the old
/// or the new session, never a mix. The session is not refreshed on its own
/// and a rejected token does not trigger a new login.
pub struct SessionTokenHolder {
    iam: Arc<dyn IamAdminClient>,
    credentials: AdminCredentials,
    realm: String,
    session: ArcSwapOption<AdminSession>,
}

impl fmt::Debug for SessionTokenHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenHolder")
            .field("username", &self.credentials.username)
            .field("realm", &self.realm)
            .field("has_session", &self.session.load().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionTokenHolder {
    #[must_use]
    pub fn new(
        iam: Arc<dyn IamAdminClient>,
        credentials: AdminCredentials,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            iam,
            credentials,
            realm: realm.into(),
            session: ArcSwapOption::from(None),
        }
    }

    /// Log in and replace the held session.
    ///
    /// On failure the previous session, if any, stays in place.
    ///
    /// # Errors
    /// Returns the adapter's error when the login fails.
    pub async fn refresh(&self) -> Result<Arc<AdminSession>, IamError> {
        let session = Arc::new(self.iam.login(&self.credentials, &self.realm).await?);
        self.session.store(Some(session.clone()));
        tracing::info!(
            realm = %self.realm,
            username = %self.credentials.username,
            expires_in = ?session.expires_in(),
            "keycloak admin session established"
        );
        Ok(session)
    }

    /// The session from the last successful login.
    ///
    /// An expired session is still returned; Keycloak decides whether to
    /// accept it.
    ///
    /// # Errors
    /// [`ProvisioningError::SessionUnavailable`] if no login has succeeded yet.
    pub fn current(&self) -> Result<Arc<AdminSession>, ProvisioningError> {
        let session = self
            .session
            .load_full()
            .ok_or(ProvisioningError::SessionUnavailable)?;
        if session.is_expired() {
            tracing::warn!(
                realm = %self.realm,
                expired = true,
                expires_in = ?session.expires_in(),
                "keycloak admin session is past its lifetime"
            );
        }
        Ok(session)
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn IamAdminClient> {
        &self.iam
    }
}
