use thiserror::Error;

use crate::resources::crd::v1::network::{NetworkSpec, PluginType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SafetyError {
    #[error("cannot change {plugin} configuration!")]
    ImmutablePluginConfig { plugin: PluginType },
    #[error("cannot change clusterNetworks!")]
    ClusterNetworksChanged,
    #[error("cannot change serviceNetwork!")]
    ServiceNetworkChanged,
}

impl NetworkSpec {
    /// Lists what makes moving from `self` (the accepted spec) to `next`
    /// unsafe. A plugin type change isn't judged here, it's a migration
    /// trigger the caller handles separately.
    pub fn check_change_safe(&self, next: &NetworkSpec) -> Vec<SafetyError> {
        let mut errors = Vec::new();

        if self.cluster_networks != next.cluster_networks {
            errors.push(SafetyError::ClusterNetworksChanged);
        }

        if self.service_network != next.service_network {
            errors.push(SafetyError::ServiceNetworkChanged);
        }

        // plugin blocks are immutable for now, an MTU rollout may be allowed later
        let plugin = next.default_network.plugin_type();
        if self.default_network.plugin_type() == plugin
            && self.default_network != next.default_network
        {
            errors.push(SafetyError::ImmutablePluginConfig { plugin });
        }

        errors
    }
}
