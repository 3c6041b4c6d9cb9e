use crate::{
    render::{
        controller_config::controller_config, node_config::node_config, ConfigArtifact,
        RenderConfig, RenderContext, RenderError,
    },
    resources::{
        crd::v1::network::{DefaultNetworkDefinition, NetworkSpec, OvnKubernetesConfig, PluginType},
        policy::PolicyKind,
    },
    validation::ValidationError,
};

use super::{check_range, PluginDescriptor, MTU_RANGE, PORT_RANGE};

pub const PLUGIN_NAME: &str = "ovn-kubernetes";
pub const DEFAULT_GENEVE_PORT: u32 = 6081;
pub const DEFAULT_MTU: u32 = 1400;

pub(super) const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    plugin_type: PluginType::OvnKubernetes,
    multiple_cluster_networks: false,
    integrated_proxy: true,
    template_dir: "network/ovn-kubernetes",
    policy_kind: PolicyKind::EgressFirewall,
    plugin_name,
    fill_defaults,
    validate,
    render,
};

fn config(network: &DefaultNetworkDefinition) -> Option<&OvnKubernetesConfig> {
    match network {
        DefaultNetworkDefinition::OvnKubernetes {
            ovn_kubernetes_config,
        } => ovn_kubernetes_config.as_ref(),
        _ => None,
    }
}

fn plugin_name(_network: &DefaultNetworkDefinition) -> &'static str {
    PLUGIN_NAME
}

fn fill_defaults(network: &mut DefaultNetworkDefinition) {
    if let DefaultNetworkDefinition::OvnKubernetes {
        ovn_kubernetes_config: Some(config),
    } = network
    {
        config.geneve_port.get_or_insert(DEFAULT_GENEVE_PORT);
        config.mtu.get_or_insert(DEFAULT_MTU);
    }
}

fn validate(network: &DefaultNetworkDefinition) -> Vec<ValidationError> {
    let Some(config) = config(network) else {
        return vec![ValidationError::MissingPluginConfig {
            plugin: PluginType::OvnKubernetes,
        }];
    };

    let mut errors = Vec::new();

    if let Some(port) = config.geneve_port {
        check_range("ovnKubernetesConfig.genevePort", port, PORT_RANGE, &mut errors);
    }

    if let Some(mtu) = config.mtu {
        check_range("ovnKubernetesConfig.mtu", mtu, MTU_RANGE, &mut errors);
    }

    errors
}

fn render(
    spec: &NetworkSpec,
    release: &RenderConfig,
    data: &mut RenderContext,
) -> Result<Vec<ConfigArtifact>, RenderError> {
    let config = config(&spec.default_network)
        .ok_or(RenderError::MissingPluginConfig(PluginType::OvnKubernetes))?;
    let geneve_port = config.geneve_port.unwrap_or(DEFAULT_GENEVE_PORT);
    let mtu = config.mtu.unwrap_or(DEFAULT_MTU);

    data.insert("OvnImage", release.ovn_image.as_str());
    data.insert("HypershiftImage", release.hypershift_image.as_str());
    data.insert("GenevePort", geneve_port);
    data.insert("MTU", mtu);

    Ok(vec![
        controller_config(spec, PLUGIN_NAME, geneve_port)?,
        node_config(spec, PLUGIN_NAME, mtu)?,
    ])
}
