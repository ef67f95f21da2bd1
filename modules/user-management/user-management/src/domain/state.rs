use std::fmt;

use user_management_sdk::RealmKey;

/// Steps of one realm provisioning attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    Unstarted,
    LockRequested,
    LockAcquired,
    Verifying,
    Found,
    NotFound,
    Creating,
    Created,
    CreateFailed,
    LookupFailed,
    LockTimeout,
    Cancelled,
    Done,
    Failed,
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a successful attempt reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// The realm already existed; nothing was written.
    Found,
    /// This attempt created the realm.
    Created,
}

/// Result of a successful provisioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub realm: RealmKey,
    pub outcome: ProvisioningOutcome,
    pub states: Vec<ProvisioningState>,
}

/// Ordered record of the states visited by one attempt.
#[derive(Debug)]
pub(crate) struct StateTrace {
    realm: RealmKey,
    states: Vec<ProvisioningState>,
}

impl StateTrace {
    pub(crate) fn new(realm: RealmKey) -> Self {
        Self {
            realm,
            states: vec![ProvisioningState::Unstarted],
        }
    }

    pub(crate) fn enter(&mut self, state: ProvisioningState) {
        tracing::trace!(realm = %self.realm, %state, "provisioning state");
        self.states.push(state);
    }

    pub(crate) fn current(&self) -> ProvisioningState {
        self.states
            .last()
            .copied()
            .unwrap_or(ProvisioningState::Unstarted)
    }

    pub(crate) fn states(&self) -> &[ProvisioningState] {
        &self.states
    }

    pub(crate) fn into_report(mut self, outcome: ProvisioningOutcome) -> ProvisioningReport {
        self.enter(ProvisioningState::Done);
        ProvisioningReport {
            realm: self.realm,
            outcome,
            states: self.states,
        }
    }
}
