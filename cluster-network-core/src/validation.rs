use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

use crate::{
    plugins::{descriptor, plugin_name},
    resources::crd::v1::network::{NetworkSpec, PluginType},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("clusterNetworks cannot be empty!")]
    MissingClusterNetworks,
    #[error("{plugin} requires exactly one clusterNetworks entry, found {count}!")]
    ClusterNetworkCount { plugin: PluginType, count: usize },
    #[error("clusterNetworks[{index}].hostSubnetLength {value} must be in [1, {max}] for {cidr}!")]
    InvalidHostSubnetLength {
        index: usize,
        cidr: IpNet,
        value: u32,
        max: u32,
    },
    #[error("clusterNetworks[{index}] ({cidr}) overlaps with {other}!")]
    OverlappingNetworks {
        index: usize,
        cidr: IpNet,
        other: IpNet,
    },
    #[error("kubeProxyConfig.bindAddress '{}' must be a valid IP address!", .0)]
    InvalidBindAddress(String),
    #[error("invalid network plugin name for {plugin}!")]
    InvalidPluginName { plugin: PluginType },
    #[error("{plugin} configuration cannot be empty!")]
    MissingPluginConfig { plugin: PluginType },
    #[error("{field} {value} must be in [{min}, {max}]!")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

impl NetworkSpec {
    /// Reports every violated constraint, in a stable order. An empty result
    /// means the (defaulted) spec can be rendered.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        validate_cluster_networks(self, &mut errors);
        validate_proxy(self, &mut errors);

        let plugin = self.default_network.plugin_type();
        if plugin_name(&self.default_network).is_empty() {
            errors.push(ValidationError::InvalidPluginName { plugin });
        }

        if let Some(descriptor) = descriptor(plugin) {
            if !descriptor.multiple_cluster_networks && self.cluster_networks.len() > 1 {
                errors.push(ValidationError::ClusterNetworkCount {
                    plugin,
                    count: self.cluster_networks.len(),
                });
            }

            errors.extend((descriptor.validate)(&self.default_network));
        }

        errors
    }
}

fn validate_cluster_networks(spec: &NetworkSpec, errors: &mut Vec<ValidationError>) {
    if spec.cluster_networks.is_empty() {
        errors.push(ValidationError::MissingClusterNetworks);
    }

    for (index, entry) in spec.cluster_networks.iter().enumerate() {
        let max = u32::from(entry.cidr.max_prefix_len() - entry.cidr.prefix_len());
        if entry.host_subnet_length < 1 || entry.host_subnet_length > max {
            errors.push(ValidationError::InvalidHostSubnetLength {
                index,
                cidr: entry.cidr,
                value: entry.host_subnet_length,
                max,
            });
        }

        let earlier = spec.cluster_networks[..index].iter().map(|entry| entry.cidr);
        let others = earlier.chain(std::iter::once(spec.service_network));
        for other in others {
            if overlaps(&entry.cidr, &other) {
                errors.push(ValidationError::OverlappingNetworks {
                    index,
                    cidr: entry.cidr,
                    other,
                });
            }
        }
    }
}

fn validate_proxy(spec: &NetworkSpec, errors: &mut Vec<ValidationError>) {
    let bind_address = spec
        .kube_proxy_config
        .as_ref()
        .and_then(|config| config.bind_address.as_deref())
        .filter(|address| !address.is_empty());

    if let Some(address) = bind_address {
        if address.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidBindAddress(address.to_owned()));
        }
    }
}

fn overlaps(left: &IpNet, right: &IpNet) -> bool {
    left.contains(right) || right.contains(left)
}
