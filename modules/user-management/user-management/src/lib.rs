#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! User Management Module
//!
//! Provisions the tenant realm in Keycloak when a replica starts, safely
//! across concurrently starting replicas.
//!
//! ## Flow
//!
//! 1. The microservice lifecycle initializes the [`KeycloakManager`]
//! 2. The manager logs in to the master realm and stores the admin session
//! 3. The [`TenantRealmProvisioner`] takes the functional-area lock and
//!    creates the `{instance_id}-{tenant_id}` realm if it does not exist
//!
//! Any failure aborts initialization.

pub use user_management_sdk::*;

pub mod config;
#[doc(hidden)]
pub mod domain;
pub mod manager;
pub mod module;
pub mod resolver;

pub use config::UserManagementConfiguration;
pub use domain::{
    ProvisioningError, ProvisioningOutcome, ProvisioningReport, ProvisioningState,
    SessionTokenHolder, TenantRealmProvisioner,
};
pub use manager::{KeycloakManager, KeycloakManagerDeps};
pub use module::UserManagementMicroservice;
pub use resolver::{ResolverDeps, TenantRealmResolver};
