use serde::Serialize;

use crate::resources::crd::v1::network::NetworkSpec;

use super::{ArtifactKind, ConfigArtifact, RenderError};

pub const CONTROLLER_CONFIG_API_VERSION: &str = "openshiftcontrolplane.config.openshift.io/v1";
pub const CONTROLLER_CONFIG_KIND: &str = "OpenShiftControllerManagerConfig";

// fields are declared in lexical key order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ControllerConfig<'a> {
    api_version: &'static str,
    kind: &'static str,
    network: NetworkControllerConfig<'a>,
}

/// Network section of the controller config. The encapsulation port is
/// written under both `vxlanPort` and the older `vxLANPort` spelling, both
/// fields come from the same constructor argument.
#[derive(Debug, Serialize)]
struct NetworkControllerConfig<'a> {
    #[serde(rename = "clusterNetworks")]
    cluster_networks: Vec<ControllerClusterNetwork>,
    #[serde(rename = "networkPluginName")]
    network_plugin_name: &'a str,
    #[serde(rename = "serviceNetworkCIDR")]
    service_network_cidr: String,
    #[serde(rename = "vxLANPort")]
    legacy_vxlan_port: u32,
    #[serde(rename = "vxlanPort")]
    vxlan_port: u32,
}

impl<'a> NetworkControllerConfig<'a> {
    fn new(spec: &NetworkSpec, network_plugin_name: &'a str, port: u32) -> Self {
        Self {
            cluster_networks: spec
                .cluster_networks
                .iter()
                .map(|entry| ControllerClusterNetwork {
                    cidr: entry.cidr.to_string(),
                    host_subnet_length: entry.host_subnet_length,
                })
                .collect(),
            network_plugin_name,
            service_network_cidr: spec.service_network.to_string(),
            legacy_vxlan_port: port,
            vxlan_port: port,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ControllerClusterNetwork {
    cidr: String,
    host_subnet_length: u32,
}

/// Builds `controller-config.yaml` for the network controller.
pub fn controller_config(
    spec: &NetworkSpec,
    network_plugin_name: &str,
    port: u32,
) -> Result<ConfigArtifact, RenderError> {
    let config = ControllerConfig {
        api_version: CONTROLLER_CONFIG_API_VERSION,
        kind: CONTROLLER_CONFIG_KIND,
        network: NetworkControllerConfig::new(spec, network_plugin_name, port),
    };

    let document = serde_yaml::to_string(&config).map_err(|source| RenderError::Serialization {
        kind: ArtifactKind::ControllerConfig,
        source,
    })?;

    Ok(ConfigArtifact {
        kind: ArtifactKind::ControllerConfig,
        document,
    })
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use crate::resources::crd::v1::network::{
        ClusterNetworkEntry, DefaultNetworkDefinition, OpenShiftSdnConfig,
    };

    use super::*;

    fn spec() -> NetworkSpec {
        NetworkSpec {
            cluster_networks: vec![
                ClusterNetworkEntry {
                    cidr: "10.128.0.0/14".parse().unwrap(),
                    host_subnet_length: 9,
                },
                ClusterNetworkEntry {
                    cidr: "10.132.0.0/14".parse().unwrap(),
                    host_subnet_length: 10,
                },
            ],
            service_network: "172.30.0.0/16".parse().unwrap(),
            default_network: DefaultNetworkDefinition::openshift_sdn(OpenShiftSdnConfig::default()),
            deploy_kube_proxy: None,
            kube_proxy_config: None,
        }
    }

    #[test]
    fn controller_config_translates_cluster_networks() {
        let artifact = controller_config(&spec(), "redhat/openshift-ovs-subnet", 4789).unwrap();
        let document: Value = serde_yaml::from_str(&artifact.document).unwrap();
        let expected: Value = serde_yaml::from_str(
            "apiVersion: openshiftcontrolplane.config.openshift.io/v1
kind: OpenShiftControllerManagerConfig
network:
  clusterNetworks:
    - cidr: 10.128.0.0/14
      hostSubnetLength: 9
    - cidr: 10.132.0.0/14
      hostSubnetLength: 10
  networkPluginName: redhat/openshift-ovs-subnet
  serviceNetworkCIDR: 172.30.0.0/16
  vxLANPort: 4789
  vxlanPort: 4789
",
        )
        .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::ControllerConfig);
        assert_eq!(document, expected);
    }

    #[test]
    fn controller_config_keys_are_sorted() {
        let artifact = controller_config(&spec(), "ovn-kubernetes", 6081).unwrap();

        let legacy = artifact.document.find("vxLANPort: 6081").unwrap();
        let current = artifact.document.find("vxlanPort: 6081").unwrap();
        let service = artifact.document.find("serviceNetworkCIDR").unwrap();

        assert!(artifact.document.starts_with("apiVersion: "));
        assert!(service < legacy && legacy < current);
    }
}
