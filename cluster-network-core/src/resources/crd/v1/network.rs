use std::{collections::BTreeMap, fmt::Display};

use ipnet::IpNet;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired cluster-wide network configuration
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "Network",
    status = "NetworkStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// pod address space, one entry per CIDR block
    #[serde(default)]
    pub cluster_networks: Vec<ClusterNetworkEntry>,
    /// CIDR the cluster services are allocated from
    pub service_network: IpNet,
    /// the selected plugin along with its plugin-specific configuration
    pub default_network: DefaultNetworkDefinition,
    /// whether a standalone kube-proxy should be deployed alongside the plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_kube_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_config: Option<ProxyConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    pub cidr: IpNet,
    /// number of address bits left for the pods of a single node
    pub host_subnet_length: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iptables_sync_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_arguments: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
pub enum PluginType {
    #[serde(rename = "OVNKubernetes")]
    OvnKubernetes,
    #[serde(rename = "OpenShiftSDN")]
    OpenShiftSdn,
}

impl Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginType::OvnKubernetes => write!(f, "OVNKubernetes"),
            PluginType::OpenShiftSdn => write!(f, "OpenShiftSDN"),
        }
    }
}

/// Plugin selection, tagged by the plugin type. The variant decides which
/// configuration block may be present, the block itself stays optional so
/// that a missing block can be reported instead of rejected on parse.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(tag = "type")]
pub enum DefaultNetworkDefinition {
    #[serde(rename = "OVNKubernetes", rename_all = "camelCase")]
    OvnKubernetes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ovn_kubernetes_config: Option<OvnKubernetesConfig>,
    },
    #[serde(rename = "OpenShiftSDN")]
    OpenShiftSdn {
        #[serde(
            rename = "openshiftSDNConfig",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        openshift_sdn_config: Option<OpenShiftSdnConfig>,
    },
}

impl DefaultNetworkDefinition {
    pub fn plugin_type(&self) -> PluginType {
        match self {
            DefaultNetworkDefinition::OvnKubernetes { .. } => PluginType::OvnKubernetes,
            DefaultNetworkDefinition::OpenShiftSdn { .. } => PluginType::OpenShiftSdn,
        }
    }

    pub fn ovn_kubernetes(config: OvnKubernetesConfig) -> Self {
        DefaultNetworkDefinition::OvnKubernetes {
            ovn_kubernetes_config: Some(config),
        }
    }

    pub fn openshift_sdn(config: OpenShiftSdnConfig) -> Self {
        DefaultNetworkDefinition::OpenShiftSdn {
            openshift_sdn_config: Some(config),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OvnKubernetesConfig {
    /// UDP port used for geneve encapsulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geneve_port: Option<u32>,
    /// MTU of the overlay network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftSdnConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SdnMode>,
    /// UDP port used for vxlan encapsulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan_port: Option<u32>,
    /// MTU of the overlay network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    /// use an openvswitch instance managed outside of the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_external_openvswitch: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum SdnMode {
    Subnet,
    Multitenant,
    NetworkPolicy,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub state: NetworkState,
    /// every error reported by the last reconciliation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// plugin type of the last successfully applied configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_plugin_type: Option<PluginType>,
    /// last successfully applied (defaulted) configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_spec: Option<NetworkSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum NetworkState {
    #[default]
    Unknown,
    Available,
    ErrorInvalidConfiguration,
    ErrorUnsafeChange,
    ErrorRendering,
    ErrorMigration,
    ErrorInsufficientPermissions,
    UnknownError,
}
