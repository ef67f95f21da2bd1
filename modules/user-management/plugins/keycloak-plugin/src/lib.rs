#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Keycloak plugin
//!
//! Implements [`user_management_sdk::IamAdminClient`] against the Keycloak
//! admin REST API:
//!
//! - login: `POST {base}/realms/{realm}/protocol/openid-connect/token`
//!   (password grant, client `admin-cli`)
//! - realm lookup: `GET {base}/admin/realms/{realm}` (404 means absent)
//! - realm creation: `POST {base}/admin/realms`

pub mod client;
pub mod config;

pub use client::KeycloakAdminClient;
pub use config::KeycloakEndpoint;
