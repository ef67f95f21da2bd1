use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use user_management_sdk::IamError;

/// Network location of a Keycloak server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeycloakEndpoint {
    /// `http` or `https`.
    pub scheme: String,
    pub hostname: String,
    pub port: u16,
    /// Per-request timeout for admin calls.
    #[serde(with = "dc_microservice::humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for KeycloakEndpoint {
    fn default() -> Self {
        Self {
            scheme: "http".to_owned(),
            hostname: "dc-keycloak".to_owned(),
            port: 8080,
            request_timeout: Duration::from_secs(1),
        }
    }
}

impl KeycloakEndpoint {
    /// `{scheme}://{hostname}:{port}`
    ///
    /// # Errors
    /// Returns [`IamError::Config`] if the parts do not form a valid URL.
    pub fn base_url(&self) -> Result<Url, IamError> {
        let raw = format!("{}://{}:{}", self.scheme, self.hostname, self.port);
        Url::parse(&raw).map_err(|e| IamError::Config(format!("invalid keycloak url '{raw}': {e}")))
    }
}
