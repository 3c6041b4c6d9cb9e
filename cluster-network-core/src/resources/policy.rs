use std::fmt::Display;

use kube::{
    api::{ApiResource, DynamicObject},
    core::GroupVersionKind,
};
use serde_json::{json, Value};

use crate::{helpers::RequireMetadata, migration::MigrationError};

/// Plugin-scoped egress policy kinds. Both kinds share the same spec layout,
/// which is what makes them a migratable pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyKind {
    EgressFirewall,
    EgressNetworkPolicy,
}

impl PolicyKind {
    pub fn group(&self) -> &'static str {
        match self {
            PolicyKind::EgressFirewall => "k8s.ovn.org",
            PolicyKind::EgressNetworkPolicy => "network.openshift.io",
        }
    }

    pub fn version(&self) -> &'static str {
        "v1"
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PolicyKind::EgressFirewall => "EgressFirewall",
            PolicyKind::EgressNetworkPolicy => "EgressNetworkPolicy",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            PolicyKind::EgressFirewall => "egressfirewalls",
            PolicyKind::EgressNetworkPolicy => "egressnetworkpolicies",
        }
    }

    /// Kind expressing the same policy under the other plugin
    pub fn paired(&self) -> PolicyKind {
        match self {
            PolicyKind::EgressFirewall => PolicyKind::EgressNetworkPolicy,
            PolicyKind::EgressNetworkPolicy => PolicyKind::EgressFirewall,
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(self.group(), self.version(), self.kind()),
            self.plural(),
        )
    }
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// A single namespaced policy object. The spec body is kept as raw JSON so
/// that fields unknown to this crate survive a translation.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyObject {
    pub kind: PolicyKind,
    pub namespace: String,
    pub name: String,
    pub spec: Value,
}

impl PolicyObject {
    pub fn from_dynamic(kind: PolicyKind, object: &DynamicObject) -> Result<Self, MigrationError> {
        let missing = || MigrationError::MissingMetadata { kind };

        Ok(Self {
            kind,
            namespace: object.require_namespace_or_else(missing)?.to_owned(),
            name: object.require_name_or_else(missing)?.to_owned(),
            spec: object.data.get("spec").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn to_dynamic(&self) -> DynamicObject {
        let data = match &self.spec {
            Value::Null => json!({}),
            spec => json!({ "spec": spec }),
        };

        DynamicObject::new(&self.name, &self.kind.api_resource())
            .within(&self.namespace)
            .data(data)
    }

    /// Same object under another kind; identity and body are copied verbatim.
    pub fn translated(&self, kind: PolicyKind) -> Self {
        Self {
            kind,
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            spec: self.spec.clone(),
        }
    }
}
