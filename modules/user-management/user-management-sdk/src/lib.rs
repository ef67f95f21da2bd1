#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! User management SDK
//!
//! Public contract between the user-management module and the identity
//! provider plugins that back it.
//!
//! - [`IamAdminClient`] - administrative operations a plugin must implement
//! - [`TenantIdentity`], [`RealmRecord`], [`AdminSession`] - the data exchanged
//! - [`IamError`] - transport-agnostic failure taxonomy

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod models;

pub use api::IamAdminClient;
pub use error::IamError;
pub use models::{AdminCredentials, AdminSession, RealmKey, RealmRecord, TenantIdentity};
