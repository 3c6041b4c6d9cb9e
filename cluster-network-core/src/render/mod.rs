use std::{collections::BTreeMap, env::var, fmt::Display, path::Path, path::PathBuf};

use derive_builder::Builder;
use itertools::Itertools;
use kube::api::DynamicObject;
use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::{
    plugins::{descriptor, plugin_name},
    resources::crd::v1::network::{ClusterNetworkEntry, NetworkSpec, PluginType},
};

use self::templates::render_dir;

pub mod controller_config;
pub mod node_config;
pub mod templates;

pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
/// Standalone service proxy manifests, relative to the template root
pub const KUBE_PROXY_TEMPLATE_DIR: &str = "network/kube-proxy";

/// Image references and other deployment-provided values merged into every
/// render. Passed in explicitly so that rendering stays a function of its
/// arguments.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RenderConfig {
    #[builder(default)]
    pub ovn_image: String,
    #[builder(default)]
    pub sdn_image: String,
    #[builder(default)]
    pub hypershift_image: String,
    #[builder(default)]
    pub kube_proxy_image: String,
    #[builder(default = "DEFAULT_IMAGE_PULL_POLICY.to_owned()")]
    pub image_pull_policy: String,
}

impl RenderConfig {
    /// Unset variables render as empty strings.
    pub fn from_env() -> Self {
        Self {
            ovn_image: var("OVN_IMAGE").unwrap_or_default(),
            sdn_image: var("SDN_IMAGE").unwrap_or_default(),
            hypershift_image: var("HYPERSHIFT_IMAGE").unwrap_or_default(),
            kube_proxy_image: var("KUBE_PROXY_IMAGE").unwrap_or_default(),
            image_pull_policy: var("IMAGE_PULL_POLICY")
                .unwrap_or_else(|_| DEFAULT_IMAGE_PULL_POLICY.to_owned()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template directory '{}' doesn't exist!", .0.display())]
    MissingTemplateDir(PathBuf),
    #[error("Couldn't walk template directory '{}'! Reason: {}", .path.display(), .source)]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Couldn't read template '{}'! Reason: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Couldn't render template '{}'! Reason: {}", .template, .source)]
    Template {
        template: String,
        source: minijinja::Error,
    },
    #[error("Document {} of template '{}' isn't a valid manifest! Reason: {}", .index, .template, .source)]
    Manifest {
        template: String,
        index: usize,
        source: serde_yaml::Error,
    },
    #[error("Couldn't serialize {}! Reason: {}", .kind, .source)]
    Serialization {
        kind: ArtifactKind,
        source: serde_yaml::Error,
    },
    #[error("{} configuration is missing, was the network validated?", .0)]
    MissingPluginConfig(PluginType),
    #[error("No renderer is registered for {}!", .0)]
    UnknownPlugin(PluginType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ControllerConfig,
    NodeConfig,
}

impl ArtifactKind {
    /// Template variable the artifact is exposed under
    pub fn context_key(&self) -> &'static str {
        match self {
            ArtifactKind::ControllerConfig => "NetworkControllerConfig",
            ArtifactKind::NodeConfig => "NodeConfig",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::ControllerConfig => write!(f, "controller config"),
            ArtifactKind::NodeConfig => write!(f, "node config"),
        }
    }
}

/// Plugin-native configuration document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    pub kind: ArtifactKind,
    pub document: String,
}

/// Template variables of a single render
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    data: BTreeMap<String, Value>,
}

impl RenderContext {
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_owned(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub(crate) fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }
}

#[derive(Debug, Clone)]
pub struct RenderedNetwork {
    pub artifacts: Vec<ConfigArtifact>,
    pub manifests: Vec<DynamicObject>,
}

impl RenderedNetwork {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ConfigArtifact> {
        self.artifacts.iter().find(|artifact| artifact.kind == kind)
    }
}

/// Compiles a validated, defaulted spec into the plugin's config documents
/// and the manifests found under `template_root`. The standalone service
/// proxy is rendered only when `deployKubeProxy` asks for it.
pub fn render_network(
    spec: &NetworkSpec,
    release: &RenderConfig,
    template_root: &Path,
) -> Result<RenderedNetwork, RenderError> {
    let plugin = spec.default_network.plugin_type();
    let descriptor = descriptor(plugin).ok_or(RenderError::UnknownPlugin(plugin))?;

    let mut data = base_context(spec, release);

    let artifacts = (descriptor.render)(spec, release, &mut data)?;
    for artifact in &artifacts {
        debug!("Rendered {}:\n{}", artifact.kind, artifact.document);
        data.insert(artifact.kind.context_key(), artifact.document.as_str());
    }

    let mut manifests = render_dir(&template_root.join(descriptor.template_dir), &data)?;

    if spec.deploy_kube_proxy.unwrap_or(!descriptor.integrated_proxy) {
        debug!("Rendering standalone kube-proxy for {plugin}");
        manifests.extend(render_dir(&template_root.join(KUBE_PROXY_TEMPLATE_DIR), &data)?);
    }

    Ok(RenderedNetwork {
        artifacts,
        manifests,
    })
}

/// Variables shared by every template tree
fn base_context(spec: &NetworkSpec, release: &RenderConfig) -> RenderContext {
    let mut data = RenderContext::default();
    data.insert("ImagePullPolicy", release.image_pull_policy.as_str());
    data.insert("KubeProxyImage", release.kube_proxy_image.as_str());
    data.insert("PluginName", plugin_name(&spec.default_network));
    data.insert("ServiceNetwork", spec.service_network.to_string());
    data.insert(
        "ClusterNetworks",
        spec.cluster_networks.iter().map(cluster_subnet).join(","),
    );
    data.insert(
        "ClusterNetworkCIDRs",
        spec.cluster_networks.iter().map(|entry| entry.cidr).join(","),
    );
    data.insert("ProxyBindAddress", spec.proxy_bind_address());

    data
}

/// `cidr/hostPrefix`, where each node gets a `/hostPrefix` slice of `cidr`
fn cluster_subnet(entry: &ClusterNetworkEntry) -> String {
    let host_prefix = u32::from(entry.cidr.max_prefix_len()).saturating_sub(entry.host_subnet_length);

    format!("{}/{}", entry.cidr, host_prefix)
}
