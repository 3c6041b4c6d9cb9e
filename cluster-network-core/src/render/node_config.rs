use std::{
    collections::BTreeMap,
    net::{IpAddr, SocketAddr},
};

use serde::Serialize;

use crate::resources::crd::v1::network::NetworkSpec;

use super::{ArtifactKind, ConfigArtifact, RenderError};

/// Substituted with the real node name by each node's agent
pub const NODE_NAME_PLACEHOLDER: &str = "%%NODENAME%%";

pub const NODE_CONFIG_API_VERSION: &str = "v1";
pub const NODE_CONFIG_KIND: &str = "NodeConfig";

pub const SERVING_CLIENT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
/// Not listened on, but the node process refuses to start without it
pub const SERVING_PORT: u16 = 10251;
pub const CONTAINER_RUNTIME_ENDPOINT: &str = "/var/run/crio/crio.sock";

// fields are declared in lexical key order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeConfig<'a> {
    api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    iptables_sync_period: Option<&'a str>,
    kind: &'static str,
    kubelet_arguments: BTreeMap<&'static str, Vec<&'static str>>,
    network_config: NodeNetworkConfig<'a>,
    node_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy_arguments: Option<&'a BTreeMap<String, Vec<String>>>,
    serving_info: ServingInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeNetworkConfig<'a> {
    mtu: u32,
    network_plugin_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ServingInfo {
    #[serde(rename = "bindAddress")]
    bind_address: String,
    #[serde(rename = "clientCA")]
    client_ca: &'static str,
}

/// Builds `node-config.yaml` for the node process.
pub fn node_config(
    spec: &NetworkSpec,
    network_plugin_name: &str,
    mtu: u32,
) -> Result<ConfigArtifact, RenderError> {
    let proxy = spec.kube_proxy_config.as_ref();

    let config = NodeConfig {
        api_version: NODE_CONFIG_API_VERSION,
        iptables_sync_period: proxy.and_then(|proxy| proxy.iptables_sync_period.as_deref()),
        kind: NODE_CONFIG_KIND,
        // the node process talks to the CRI endpoint directly
        kubelet_arguments: BTreeMap::from([
            ("container-runtime", vec!["remote"]),
            ("container-runtime-endpoint", vec![CONTAINER_RUNTIME_ENDPOINT]),
        ]),
        network_config: NodeNetworkConfig {
            mtu,
            network_plugin_name,
        },
        node_name: NODE_NAME_PLACEHOLDER,
        proxy_arguments: proxy.and_then(|proxy| proxy.proxy_arguments.as_ref()),
        serving_info: ServingInfo {
            bind_address: serving_address(spec.proxy_bind_address()),
            client_ca: SERVING_CLIENT_CA,
        },
    };

    let document = serde_yaml::to_string(&config).map_err(|source| RenderError::Serialization {
        kind: ArtifactKind::NodeConfig,
        source,
    })?;

    Ok(ConfigArtifact {
        kind: ArtifactKind::NodeConfig,
        document,
    })
}

fn serving_address(bind_address: &str) -> String {
    match bind_address.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, SERVING_PORT).to_string(),
        Err(_) => format!("{bind_address}:{SERVING_PORT}"),
    }
}
