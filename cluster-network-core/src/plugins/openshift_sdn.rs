use crate::{
    render::{
        controller_config::controller_config, node_config::node_config, ConfigArtifact,
        RenderConfig, RenderContext, RenderError,
    },
    resources::{
        crd::v1::network::{
            DefaultNetworkDefinition, NetworkSpec, OpenShiftSdnConfig, PluginType, SdnMode,
        },
        policy::PolicyKind,
    },
    validation::ValidationError,
};

use super::{check_range, PluginDescriptor, MTU_RANGE, PORT_RANGE};

pub const DEFAULT_MODE: SdnMode = SdnMode::NetworkPolicy;
pub const DEFAULT_VXLAN_PORT: u32 = 4789;
pub const DEFAULT_MTU: u32 = 1450;

pub(super) const DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    plugin_type: PluginType::OpenShiftSdn,
    multiple_cluster_networks: true,
    integrated_proxy: true,
    template_dir: "network/openshift-sdn",
    policy_kind: PolicyKind::EgressNetworkPolicy,
    plugin_name,
    fill_defaults,
    validate,
    render,
};

fn config(network: &DefaultNetworkDefinition) -> Option<&OpenShiftSdnConfig> {
    match network {
        DefaultNetworkDefinition::OpenShiftSdn {
            openshift_sdn_config,
        } => openshift_sdn_config.as_ref(),
        _ => None,
    }
}

fn mode_plugin_name(mode: SdnMode) -> &'static str {
    match mode {
        SdnMode::Subnet => "redhat/openshift-ovs-subnet",
        SdnMode::Multitenant => "redhat/openshift-ovs-multitenant",
        SdnMode::NetworkPolicy => "redhat/openshift-ovs-networkpolicy",
    }
}

fn plugin_name(network: &DefaultNetworkDefinition) -> &'static str {
    let mode = config(network)
        .and_then(|config| config.mode)
        .unwrap_or(DEFAULT_MODE);

    mode_plugin_name(mode)
}

fn fill_defaults(network: &mut DefaultNetworkDefinition) {
    if let DefaultNetworkDefinition::OpenShiftSdn {
        openshift_sdn_config: Some(config),
    } = network
    {
        config.mode.get_or_insert(DEFAULT_MODE);
        config.vxlan_port.get_or_insert(DEFAULT_VXLAN_PORT);
        config.mtu.get_or_insert(DEFAULT_MTU);
        config.use_external_openvswitch.get_or_insert(false);
    }
}

fn validate(network: &DefaultNetworkDefinition) -> Vec<ValidationError> {
    let Some(config) = config(network) else {
        return vec![ValidationError::MissingPluginConfig {
            plugin: PluginType::OpenShiftSdn,
        }];
    };

    let mut errors = Vec::new();

    if let Some(port) = config.vxlan_port {
        check_range("openshiftSDNConfig.vxlanPort", port, PORT_RANGE, &mut errors);
    }

    if let Some(mtu) = config.mtu {
        check_range("openshiftSDNConfig.mtu", mtu, MTU_RANGE, &mut errors);
    }

    errors
}

fn render(
    spec: &NetworkSpec,
    release: &RenderConfig,
    data: &mut RenderContext,
) -> Result<Vec<ConfigArtifact>, RenderError> {
    let config = config(&spec.default_network)
        .ok_or(RenderError::MissingPluginConfig(PluginType::OpenShiftSdn))?;
    let name = plugin_name(&spec.default_network);
    let vxlan_port = config.vxlan_port.unwrap_or(DEFAULT_VXLAN_PORT);
    let mtu = config.mtu.unwrap_or(DEFAULT_MTU);

    data.insert("SdnImage", release.sdn_image.as_str());
    data.insert("VxlanPort", vxlan_port);
    data.insert("MTU", mtu);
    data.insert(
        "UseExternalOpenvswitch",
        config.use_external_openvswitch.unwrap_or(false),
    );

    Ok(vec![
        controller_config(spec, name, vxlan_port)?,
        node_config(spec, name, mtu)?,
    ])
}
