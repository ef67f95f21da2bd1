use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;
use user_management_sdk::{AdminCredentials, AdminSession, IamAdminClient, IamError, RealmRecord};

use crate::config::KeycloakEndpoint;

const ADMIN_CLIENT_ID: &str = "admin-cli";
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60);
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Keycloak admin REST client. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct KeycloakAdminClient {
    http: reqwest::Client,
    base: Url,
}

impl KeycloakAdminClient {
    /// # Errors
    /// Returns [`IamError::Config`] if the endpoint does not form a usable URL
    /// or the HTTP client cannot be built.
    pub fn new(endpoint: &KeycloakEndpoint) -> Result<Self, IamError> {
        let base = endpoint.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(endpoint.request_timeout)
            .build()
            .map_err(|e| IamError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, base })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, IamError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| IamError::Config(format!("base url '{}' cannot hold a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport(operation: &'static str, e: &reqwest::Error) -> IamError {
    IamError::Transport {
        operation,
        message: e.to_string(),
    }
}

/// Map a non-success response to an error, keeping a bounded slice of the body.
async fn status_error(operation: &'static str, response: reqwest::Response) -> IamError {
    let status = response.status();
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| message.is_char_boundary(*i))
            .unwrap_or(0);
        message.truncate(cut);
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return IamError::Unauthorized {
            status: status.as_u16(),
            message: format!("{operation} returned {status}"),
        };
    }
    IamError::Status {
        operation,
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl IamAdminClient for KeycloakAdminClient {
    async fn login(
        &self,
        credentials: &AdminCredentials,
        realm: &str,
    ) -> Result<AdminSession, IamError> {
        const OP: &str = "login";
        let url = self.url(&["realms", realm, "protocol", "openid-connect", "token"])?;
        tracing::debug!(%url, username = %credentials.username, "requesting admin token");

        let form = [
            ("grant_type", "password"),
            ("client_id", ADMIN_CLIENT_ID),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose()),
        ];
        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport(OP, &e))?;

        if !response.status().is_success() {
            return Err(status_error(OP, response).await);
        }

        let token: TokenResponse = response.json().await.map_err(|e| IamError::InvalidResponse {
            operation: OP,
            message: e.to_string(),
        })?;
        let ttl = token
            .expires_in
            .map_or(DEFAULT_TOKEN_TTL, Duration::from_secs);
        Ok(AdminSession::new(token.access_token, ttl))
    }

    async fn get_realm(
        &self,
        session: &AdminSession,
        realm: &str,
    ) -> Result<Option<RealmRecord>, IamError> {
        const OP: &str = "get realm";
        let url = self.url(&["admin", "realms", realm])?;

        let response = self
            .http
            .get(url)
            .bearer_auth(session.access_token())
            .send()
            .await
            .map_err(|e| transport(OP, &e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(OP, response).await);
        }

        let record = response.json().await.map_err(|e| IamError::InvalidResponse {
            operation: OP,
            message: e.to_string(),
        })?;
        Ok(Some(record))
    }

    async fn create_realm(
        &self,
        session: &AdminSession,
        record: &RealmRecord,
    ) -> Result<(), IamError> {
        const OP: &str = "create realm";
        let url = self.url(&["admin", "realms"])?;
        tracing::debug!(%url, realm = %record.realm, "creating realm");

        let response = self
            .http
            .post(url)
            .bearer_auth(session.access_token())
            .json(record)
            .send()
            .await
            .map_err(|e| transport(OP, &e))?;

        if !response.status().is_success() {
            return Err(status_error(OP, response).await);
        }
        Ok(())
    }
}
