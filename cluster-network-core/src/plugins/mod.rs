use crate::{
    render::{ConfigArtifact, RenderConfig, RenderContext, RenderError},
    resources::{
        crd::v1::network::{DefaultNetworkDefinition, NetworkSpec, PluginType},
        policy::PolicyKind,
    },
    validation::ValidationError,
};

pub mod openshift_sdn;
pub mod ovn_kubernetes;

/// Everything the defaulter, validator, renderer and migrator need to know
/// about a single network plugin. Adding a plugin means adding a module that
/// exposes one of these and listing it in [`PLUGINS`].
pub struct PluginDescriptor {
    pub plugin_type: PluginType,
    /// whether more than one cluster network entry can be served
    pub multiple_cluster_networks: bool,
    /// whether the plugin ships its own service proxy
    pub integrated_proxy: bool,
    /// manifest directory, relative to the template root
    pub template_dir: &'static str,
    /// egress policy kind this plugin enforces
    pub policy_kind: PolicyKind,
    pub plugin_name: fn(&DefaultNetworkDefinition) -> &'static str,
    pub fill_defaults: fn(&mut DefaultNetworkDefinition),
    pub validate: fn(&DefaultNetworkDefinition) -> Vec<ValidationError>,
    pub render: fn(&NetworkSpec, &RenderConfig, &mut RenderContext) -> Result<Vec<ConfigArtifact>, RenderError>,
}

pub static PLUGINS: &[PluginDescriptor] = &[ovn_kubernetes::DESCRIPTOR, openshift_sdn::DESCRIPTOR];

pub fn descriptor(plugin_type: PluginType) -> Option<&'static PluginDescriptor> {
    PLUGINS
        .iter()
        .find(|descriptor| descriptor.plugin_type == plugin_type)
}

/// Canonical plugin name as consumed by the node and controller processes.
/// Empty when the plugin isn't registered.
pub fn plugin_name(network: &DefaultNetworkDefinition) -> &'static str {
    descriptor(network.plugin_type())
        .map(|descriptor| (descriptor.plugin_name)(network))
        .unwrap_or_default()
}

pub(crate) fn check_range(
    field: &'static str,
    value: u32,
    (min, max): (u32, u32),
    errors: &mut Vec<ValidationError>,
) {
    if value < min || value > max {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}

pub(crate) const PORT_RANGE: (u32, u32) = (1, 65535);
pub(crate) const MTU_RANGE: (u32, u32) = (576, 65536);
