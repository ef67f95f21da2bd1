#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! DeviceChain microservice core.
//!
//! Shared plumbing used by every DeviceChain functional area:
//!
//! - [`context::MicroserviceContext`] - identity of the running replica
//!   (instance, tenant, functional area)
//! - [`lifecycle`] - the initialize → start → stop → terminate state machine
//!   with pre/post hooks per phase
//! - [`runner::run_lifecycle`] - drives a set of managed components through
//!   all phases and waits for shutdown
//! - [`lock`] - lease-based distributed mutual exclusion with bounded retries
//! - [`config::AppConfig`] - layered configuration (defaults → YAML → env)
//! - [`logging`] - `tracing-subscriber` initialization
//!
//! Components receive their collaborators explicitly; nothing in this crate
//! keeps process-level mutable state.

pub mod config;
pub mod context;
pub mod humantime_serde;
pub mod lifecycle;
pub mod lock;
pub mod logging;
pub mod runner;
pub mod secret;
pub mod signals;

pub use config::{AppConfig, ConfigError, InfrastructureConfig, KeycloakInfrastructure};
pub use context::MicroserviceContext;
pub use lifecycle::{
    HookStage, LifecycleCallback, LifecycleCallbacks, LifecycleComponent, LifecycleError,
    LifecycleManager, LifecycleStatus, Phase,
};
pub use lock::{DistributedLock, InMemoryLock, LockConfig, LockError, LockHandle, with_lock};
pub use logging::{LogFormat, LoggingConfig};
pub use runner::{ManagedComponent, run_lifecycle};
pub use secret::SecretString;
