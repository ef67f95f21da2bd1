//! Process-level lifecycle driver.
//!
//! Phase order: **initialize (in order) → start (in order) → wait →
//! stop (reverse) → terminate (reverse)**.
//!
//! If any component fails to initialize, nothing is started: the failed
//! component and every component initialized before it are terminated in
//! reverse order and the error is returned, so the process exits instead of
//! serving without its realm.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::LifecycleError;

/// A component owned by the process and driven through its lifecycle.
#[async_trait]
pub trait ManagedComponent: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self, cancel: CancellationToken) -> Result<(), LifecycleError>;
    async fn start(&self, cancel: CancellationToken) -> Result<(), LifecycleError>;
    async fn stop(&self, cancel: CancellationToken) -> Result<(), LifecycleError>;
    async fn terminate(&self, cancel: CancellationToken) -> Result<(), LifecycleError>;
}

/// Drive `components` through all phases, blocking until `cancel` fires.
///
/// Stop and terminate run with a fresh token because `cancel` is already
/// cancelled by then.
///
/// # Errors
/// Returns the first initialize or start failure. Stop and terminate failures
/// are logged; the first of them is returned after every component was visited.
pub async fn run_lifecycle(
    components: &[Arc<dyn ManagedComponent>],
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(components = components.len(), "Phase: initialize");
    for (idx, component) in components.iter().enumerate() {
        if let Err(e) = component.initialize(cancel.clone()).await {
            tracing::error!(component = component.name(), error = %e, "initialization failed, aborting startup");
            terminate_all(&components[..=idx]).await;
            return Err(e.into());
        }
    }

    tracing::info!("Phase: start");
    for (idx, component) in components.iter().enumerate() {
        if let Err(e) = component.start(cancel.clone()).await {
            tracing::error!(component = component.name(), error = %e, "start failed, shutting down");
            stop_all(&components[..idx]).await;
            terminate_all(components).await;
            return Err(e.into());
        }
    }

    tracing::info!("Phase: running");
    cancel.cancelled().await;

    tracing::info!("Phase: stop");
    let stop_err = stop_all(components).await;

    tracing::info!("Phase: terminate");
    let term_err = terminate_all(components).await;

    match stop_err.or(term_err) {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn stop_all(components: &[Arc<dyn ManagedComponent>]) -> Option<LifecycleError> {
    let mut first = None;
    for component in components.iter().rev() {
        if let Err(e) = component.stop(CancellationToken::new()).await {
            tracing::warn!(component = component.name(), error = %e, "stop failed");
            first.get_or_insert(e);
        }
    }
    first
}

async fn terminate_all(components: &[Arc<dyn ManagedComponent>]) -> Option<LifecycleError> {
    let mut first = None;
    for component in components.iter().rev() {
        if let Err(e) = component.terminate(CancellationToken::new()).await {
            tracing::warn!(component = component.name(), error = %e, "terminate failed");
            first.get_or_insert(e);
        }
    }
    first
}
