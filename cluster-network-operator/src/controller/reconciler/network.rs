use std::{sync::Arc, time::Duration};

use cluster_network_core::{
    helpers::RequireMetadata,
    migration::{migrate_policies, store::KubeStoreContext, MigrationError, PluginTransition},
    render::render_network,
    resources::crd::v1::network::{Network, NetworkState, NetworkStatus, PluginType},
    FIELD_MANAGER,
};
use kube::{
    api::{DynamicObject, Patch, PatchParams},
    core::{GroupVersionKind, TypeMeta},
    discovery::{pinned_kind, Scope},
    runtime::controller::Action,
    Api, Client, Resource,
};
use log::{info, warn};
use serde_json::json;

use super::{context::ReconcilerContext, error::ReconcilerError};

const SUCCESS_REQUEUE_SECS: u64 = 60 * 5;

const DEFAULT_ERROR_REQUEUE_SECS: u64 = 10;
const VALIDATION_ERROR_REQUEUE_SECS: u64 = 60 * 5;

pub async fn reconcile_network(
    object: Arc<Network>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, ReconcilerError> {
    let name = object.require_name_or_else(|| ReconcilerError::MissingObjectMetadata)?;
    let previous = object.status.clone().unwrap_or_default();

    match try_reconcile(&object, name, &previous, &context).await {
        Ok(status) => {
            apply_status(&context.client, name, &status).await?;

            Ok(Action::requeue(Duration::from_secs(SUCCESS_REQUEUE_SECS)))
        }
        Err(error) => {
            // the last applied configuration stays recorded until a new one succeeds
            let status = NetworkStatus {
                state: get_error_state(&error),
                message: Some(error.to_string()),
                ..previous
            };

            if let Err(status_error) = apply_status(&context.client, name, &status).await {
                warn!("Couldn't report the failure on network '{name}'! {status_error}");
            }

            Err(error)
        }
    }
}

pub fn reconcile_network_error(
    _object: Arc<Network>,
    error: &ReconcilerError,
    _context: Arc<ReconcilerContext>,
) -> Action {
    Action::requeue(get_error_requeue(error))
}

fn get_error_requeue(error: &ReconcilerError) -> Duration {
    match error {
        ReconcilerError::Validation(_) | ReconcilerError::Safety(_) => {
            Duration::from_secs(VALIDATION_ERROR_REQUEUE_SECS)
        }
        _ => Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
    }
}

async fn try_reconcile(
    object: &Network,
    name: &str,
    previous: &NetworkStatus,
    context: &ReconcilerContext,
) -> Result<NetworkStatus, ReconcilerError> {
    let spec = object.spec.defaulted();

    let errors = spec.validate();
    if !errors.is_empty() {
        return Err(ReconcilerError::Validation(errors));
    }

    if let Some(applied) = &previous.applied_spec {
        let errors = applied.check_change_safe(&spec);
        if !errors.is_empty() {
            return Err(ReconcilerError::Safety(errors));
        }
    }

    let release = &context.release;
    let rendered = render_network(&spec, &release.render_config, &release.manifest_dir)
        .map_err(ReconcilerError::Render)?;

    for manifest in &rendered.manifests {
        apply_manifest(&context.client, manifest).await?;
    }

    let plugin = spec.default_network.plugin_type();
    if let Some(transition) = PluginTransition::between(previous.applied_plugin_type, plugin) {
        info!(
            "Default network changed from {} to {}, migrating egress policies...",
            transition.from, transition.to
        );

        let summary = migrate_policies(
            &context.policy_store,
            &KubeStoreContext::default(),
            transition,
            release.conflict_policy,
        )
        .await
        .map_err(ReconcilerError::Migration)?;

        info!(
            "Egress policies migrated: {} created, {} skipped",
            summary.created, summary.skipped
        );

        // a failure past this point must not trigger the same migration again
        apply_status(&context.client, name, &migrated_status(previous, plugin)).await?;
    }

    Ok(NetworkStatus {
        state: NetworkState::Available,
        message: None,
        applied_plugin_type: Some(plugin),
        applied_spec: Some(spec),
    })
}

/// Status recorded right after a successful migration: the new plugin type
/// is applied while everything else still describes the last full pass.
fn migrated_status(previous: &NetworkStatus, plugin: PluginType) -> NetworkStatus {
    NetworkStatus {
        applied_plugin_type: Some(plugin),
        ..previous.clone()
    }
}

async fn apply_manifest(client: &Client, manifest: &DynamicObject) -> Result<(), ReconcilerError> {
    let name = manifest.require_name_or_else(|| ReconcilerError::MissingObjectMetadata)?;
    let types = manifest
        .types
        .as_ref()
        .ok_or_else(|| ReconcilerError::MissingManifestType(name.to_owned()))?;

    let (resource, capabilities) = pinned_kind(client, &group_version_kind(types))
        .await
        .map_err(ReconcilerError::KubeApiError)?;

    let api: Api<DynamicObject> = match capabilities.scope {
        Scope::Namespaced => {
            let namespace =
                manifest.require_namespace_or_else(|| ReconcilerError::MissingObjectMetadata)?;
            Api::namespaced_with(client.clone(), namespace, &resource)
        }
        Scope::Cluster => Api::all_with(client.clone(), &resource),
    };

    info!("Applying {} '{}'...", types.kind, name);
    api.patch(
        name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(manifest),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

fn group_version_kind(types: &TypeMeta) -> GroupVersionKind {
    let (group, version) = types
        .api_version
        .split_once('/')
        .unwrap_or(("", types.api_version.as_str()));

    GroupVersionKind::gvk(group, version, &types.kind)
}

async fn apply_status(
    client: &Client,
    name: &str,
    status: &NetworkStatus,
) -> Result<(), ReconcilerError> {
    let api: Api<Network> = Api::all(client.clone());
    let patch = json!({
        "apiVersion": Network::api_version(&()),
        "kind": Network::kind(&()),
        "status": status,
    });

    api.patch_status(
        name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&patch),
    )
    .await
    .map_err(ReconcilerError::KubeApiError)?;

    Ok(())
}

fn get_error_state(error: &ReconcilerError) -> NetworkState {
    match error {
        ReconcilerError::Validation(_) => NetworkState::ErrorInvalidConfiguration,
        ReconcilerError::Safety(_) => NetworkState::ErrorUnsafeChange,
        ReconcilerError::Render(_) => NetworkState::ErrorRendering,
        ReconcilerError::Migration(err) => match err {
            MigrationError::List { source, .. } | MigrationError::Create { source, .. }
                if is_forbidden(source) =>
            {
                NetworkState::ErrorInsufficientPermissions
            }
            _ => NetworkState::ErrorMigration,
        },
        ReconcilerError::KubeApiError(err) if is_forbidden(err) => {
            NetworkState::ErrorInsufficientPermissions
        }
        _ => NetworkState::UnknownError,
    }
}

fn is_forbidden(error: &kube::Error) -> bool {
    match error {
        kube::Error::Auth(_) => true,
        kube::Error::Api(err) => err.code == 403,
        _ => false,
    }
}
