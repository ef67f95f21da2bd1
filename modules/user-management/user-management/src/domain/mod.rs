//! Domain layer for tenant realm provisioning.

pub mod error;
pub mod provisioner;
pub mod session;
pub mod state;

pub use error::ProvisioningError;
pub use provisioner::TenantRealmProvisioner;
pub use session::SessionTokenHolder;
pub use state::{ProvisioningOutcome, ProvisioningReport, ProvisioningState};
