//! Component lifecycle state machine.
//!
//! A component moves through four phases: **initialize → start → stop →
//! terminate**. Each phase runs, in order:
//!
//! 1. the `preprocess` hook registered for the phase (if any),
//! 2. the component body ([`LifecycleComponent`]),
//! 3. the `postprocess` hook (if any).
//!
//! The first failing step aborts the phase and leaves the component in the
//! phase's error status. A phase cannot be entered from a status that does
//! not allow it (e.g. `start` before a successful `initialize`).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Hook executed around a phase body.
pub type PhaseHook =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

fn hook<F, Fut>(f: F) -> PhaseHook
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |cancel| -> BoxFuture<'static, anyhow::Result<()>> { Box::pin(f(cancel)) })
}

/// Pre/post hooks for one phase.
#[derive(Clone, Default)]
pub struct LifecycleCallback {
    pub preprocess: Option<PhaseHook>,
    pub postprocess: Option<PhaseHook>,
}

impl LifecycleCallback {
    /// Hook that runs before the phase body.
    #[must_use]
    pub fn before<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            preprocess: Some(hook(f)),
            postprocess: None,
        }
    }

    /// Hook that runs after the phase body succeeded.
    #[must_use]
    pub fn after<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            preprocess: None,
            postprocess: Some(hook(f)),
        }
    }

    /// Adds a postprocess hook to a callback built with [`before`](Self::before).
    #[must_use]
    pub fn then_after<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.postprocess = Some(hook(f));
        self
    }
}

impl fmt::Debug for LifecycleCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCallback")
            .field("preprocess", &self.preprocess.is_some())
            .field("postprocess", &self.postprocess.is_some())
            .finish()
    }
}

/// Hooks for all four phases. `Default` is the no-op set.
#[derive(Clone, Debug, Default)]
pub struct LifecycleCallbacks {
    pub initializer: LifecycleCallback,
    pub starter: LifecycleCallback,
    pub stopper: LifecycleCallback,
    pub terminator: LifecycleCallback,
}

impl LifecycleCallbacks {
    #[must_use]
    pub fn no_op() -> Self {
        Self::default()
    }

    fn for_phase(&self, phase: Phase) -> &LifecycleCallback {
        match phase {
            Phase::Initialize => &self.initializer,
            Phase::Start => &self.starter,
            Phase::Stop => &self.stopper,
            Phase::Terminate => &self.terminator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Initialize,
    Start,
    Stop,
    Terminate,
}

impl Phase {
    fn allowed_from(self, status: LifecycleStatus) -> bool {
        use LifecycleStatus as S;
        match self {
            Phase::Initialize => matches!(status, S::Uninitialized | S::InitializationError),
            Phase::Start => matches!(status, S::Initialized | S::StartError | S::Stopped),
            Phase::Stop => matches!(status, S::Started | S::StopError),
            Phase::Terminate => matches!(
                status,
                S::Uninitialized
                    | S::Initialized
                    | S::InitializationError
                    | S::StartError
                    | S::Stopped
                    | S::StopError
            ),
        }
    }

    fn in_progress(self) -> LifecycleStatus {
        match self {
            Phase::Initialize => LifecycleStatus::Initializing,
            Phase::Start => LifecycleStatus::Starting,
            Phase::Stop => LifecycleStatus::Stopping,
            Phase::Terminate => LifecycleStatus::Terminating,
        }
    }

    fn completed(self) -> LifecycleStatus {
        match self {
            Phase::Initialize => LifecycleStatus::Initialized,
            Phase::Start => LifecycleStatus::Started,
            Phase::Stop => LifecycleStatus::Stopped,
            Phase::Terminate => LifecycleStatus::Terminated,
        }
    }

    fn failed(self) -> LifecycleStatus {
        match self {
            Phase::Initialize => LifecycleStatus::InitializationError,
            Phase::Start => LifecycleStatus::StartError,
            Phase::Stop => LifecycleStatus::StopError,
            Phase::Terminate => LifecycleStatus::TerminationError,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Initialize => "initialize",
            Phase::Start => "start",
            Phase::Stop => "stop",
            Phase::Terminate => "terminate",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Preprocess,
    Postprocess,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookStage::Preprocess => "preprocess",
            HookStage::Postprocess => "postprocess",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleStatus {
    #[default]
    Uninitialized,
    Initializing,
    InitializationError,
    Initialized,
    Starting,
    StartError,
    Started,
    Stopping,
    StopError,
    Stopped,
    Terminating,
    TerminationError,
    Terminated,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("component '{component}' cannot {phase} while {status}")]
    InvalidTransition {
        component: String,
        phase: Phase,
        status: LifecycleStatus,
    },

    #[error("{stage} hook of component '{component}' failed during {phase}: {source}")]
    Hook {
        component: String,
        phase: Phase,
        stage: HookStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("component '{component}' failed to {phase}: {source}")]
    Phase {
        component: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },
}

impl LifecycleError {
    /// Underlying failure of a hook or phase body, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            LifecycleError::InvalidTransition { .. } => None,
            LifecycleError::Hook { source, .. } | LifecycleError::Phase { source, .. } => {
                Some(source)
            }
        }
    }
}

/// Phase bodies of a managed component.
#[async_trait]
pub trait LifecycleComponent: Send + Sync {
    async fn execute_initialize(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn execute_start(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn execute_stop(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn execute_terminate(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}

/// Tracks the status of one component and runs its phases with hooks.
pub struct LifecycleManager {
    name: String,
    callbacks: LifecycleCallbacks,
    status: Mutex<LifecycleStatus>,
}

impl fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("name", &self.name)
            .field("callbacks", &self.callbacks)
            .field("status", &*self.status.lock())
            .finish()
    }
}

impl LifecycleManager {
    #[must_use]
    pub fn new(name: impl Into<String>, callbacks: LifecycleCallbacks) -> Self {
        Self {
            name: name.into(),
            callbacks,
            status: Mutex::new(LifecycleStatus::Uninitialized),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn status(&self) -> LifecycleStatus {
        *self.status.lock()
    }

    /// # Errors
    /// Returns [`LifecycleError`] if the transition is not allowed or a hook or the body fails.
    pub async fn initialize(
        &self,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Initialize, component, cancel).await
    }

    /// # Errors
    /// Returns [`LifecycleError`] if the transition is not allowed or a hook or the body fails.
    pub async fn start(
        &self,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Start, component, cancel).await
    }

    /// # Errors
    /// Returns [`LifecycleError`] if the transition is not allowed or a hook or the body fails.
    pub async fn stop(
        &self,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Stop, component, cancel).await
    }

    /// # Errors
    /// Returns [`LifecycleError`] if the transition is not allowed or a hook or the body fails.
    pub async fn terminate(
        &self,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        self.run_phase(Phase::Terminate, component, cancel).await
    }

    async fn run_phase(
        &self,
        phase: Phase,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        self.enter(phase)?;
        tracing::debug!(component = %self.name, %phase, "lifecycle phase begin");

        let result = self.execute(phase, component, cancel).await;

        let next = if result.is_ok() {
            phase.completed()
        } else {
            phase.failed()
        };
        *self.status.lock() = next;

        match &result {
            Ok(()) => tracing::debug!(component = %self.name, %phase, status = %next, "lifecycle phase done"),
            Err(e) => tracing::error!(component = %self.name, %phase, error = %e, "lifecycle phase failed"),
        }
        result
    }

    fn enter(&self, phase: Phase) -> Result<(), LifecycleError> {
        let mut status = self.status.lock();
        if !phase.allowed_from(*status) {
            return Err(LifecycleError::InvalidTransition {
                component: self.name.clone(),
                phase,
                status: *status,
            });
        }
        *status = phase.in_progress();
        Ok(())
    }

    async fn execute(
        &self,
        phase: Phase,
        component: &dyn LifecycleComponent,
        cancel: CancellationToken,
    ) -> Result<(), LifecycleError> {
        let callback = self.callbacks.for_phase(phase);

        if let Some(pre) = &callback.preprocess {
            pre(cancel.clone())
                .await
                .map_err(|source| self.hook_error(phase, HookStage::Preprocess, source))?;
        }

        let body = match phase {
            Phase::Initialize => component.execute_initialize(cancel.clone()).await,
            Phase::Start => component.execute_start(cancel.clone()).await,
            Phase::Stop => component.execute_stop(cancel.clone()).await,
            Phase::Terminate => component.execute_terminate(cancel.clone()).await,
        };
        body.map_err(|source| LifecycleError::Phase {
            component: self.name.clone(),
            phase,
            source,
        })?;

        if let Some(post) = &callback.postprocess {
            post(cancel)
                .await
                .map_err(|source| self.hook_error(phase, HookStage::Postprocess, source))?;
        }
        Ok(())
    }

    fn hook_error(&self, phase: Phase, stage: HookStage, source: anyhow::Error) -> LifecycleError {
        LifecycleError::Hook {
            component: self.name.clone(),
            phase,
            stage,
            source,
        }
    }
}
