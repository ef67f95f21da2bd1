//! Identity of the running microservice replica.

use serde::{Deserialize, Serialize};

/// Identity shared by every component of a microservice replica.
///
/// All replicas serving the same tenant carry the same values, so anything
/// derived from them (realm names, lock names) is identical across the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MicroserviceContext {
    /// DeviceChain instance the replica belongs to.
    pub instance_id: String,

    /// Tenant served by the replica.
    pub tenant_id: String,

    /// Human-readable tenant name.
    pub tenant_name: String,

    /// Functional area implemented by the microservice (e.g. `user-management`).
    pub functional_area: String,
}

impl Default for MicroserviceContext {
    fn default() -> Self {
        Self {
            instance_id: "devicechain".to_owned(),
            tenant_id: "default".to_owned(),
            tenant_name: "Default Tenant".to_owned(),
            functional_area: "user-management".to_owned(),
        }
    }
}

impl MicroserviceContext {
    /// Name of a sub-component scoped to this functional area.
    #[must_use]
    pub fn component_name(&self, component: &str) -> String {
        format!("{}-{component}", self.functional_area)
    }
}
