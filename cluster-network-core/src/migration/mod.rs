use log::{info, warn};
use thiserror::Error;

use crate::{
    plugins::descriptor,
    resources::{
        crd::v1::network::PluginType,
        policy::{PolicyKind, PolicyObject},
    },
};

use self::store::PolicyStore;

pub mod store;

/// A change of the active plugin type, computed once by the caller from the
/// last applied and the current plugin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginTransition {
    pub from: PluginType,
    pub to: PluginType,
}

impl PluginTransition {
    /// `None` when nothing was applied yet or the type didn't change.
    pub fn between(last_applied: Option<PluginType>, current: PluginType) -> Option<Self> {
        match last_applied {
            Some(from) if from != current => Some(Self { from, to: current }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationState {
    #[default]
    Idle,
    Scanning,
    Translating,
    Creating,
    Done,
    Failed,
}

/// What to do when a translated object already exists. Re-running a
/// migration fails on the first duplicate unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    #[default]
    Fail,
    SkipExisting,
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("No policy kind is registered for {}!", .0)]
    UnknownPlugin(PluginType),
    #[error("Couldn't list {} resources! Reason: {}", .kind, .source)]
    List {
        kind: PolicyKind,
        source: kube::Error,
    },
    #[error("Listed {} resource is missing a name or a namespace!", .kind)]
    MissingMetadata { kind: PolicyKind },
    #[error("Couldn't create {} '{}/{}'! Reason: {}", .kind, .namespace, .name, .source)]
    Create {
        kind: PolicyKind,
        namespace: String,
        name: String,
        source: kube::Error,
    },
}

/// Source objects paired with the kind they're translated into
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub items: Vec<(PolicyObject, PolicyKind)>,
}

impl MigrationPlan {
    pub fn translate(&self) -> Vec<PolicyObject> {
        self.items
            .iter()
            .map(|(source, target)| source.translated(*target))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationSummary {
    pub created: usize,
    pub skipped: usize,
}

pub struct Migrator<'a, S: PolicyStore> {
    store: &'a S,
    conflict_policy: ConflictPolicy,
    state: MigrationState,
}

impl<'a, S: PolicyStore> Migrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            conflict_policy: ConflictPolicy::default(),
            state: MigrationState::Idle,
        }
    }

    pub fn with_conflict_policy(mut self, conflict_policy: ConflictPolicy) -> Self {
        self.conflict_policy = conflict_policy;

        self
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Recreates the policies of the previous plugin under the kind of the new
    /// one. Stops at the first failed creation, objects created before it stay.
    pub async fn run(
        &mut self,
        context: &S::Context,
        transition: PluginTransition,
    ) -> Result<MigrationSummary, MigrationError> {
        let result = self.try_run(context, transition).await;

        self.state = match result {
            Ok(_) => MigrationState::Done,
            Err(_) => MigrationState::Failed,
        };

        result
    }

    async fn try_run(
        &mut self,
        context: &S::Context,
        transition: PluginTransition,
    ) -> Result<MigrationSummary, MigrationError> {
        let target = descriptor(transition.to)
            .ok_or(MigrationError::UnknownPlugin(transition.to))?
            .policy_kind;
        let source = target.paired();

        info!(
            "Migrating {source} resources to {target} ({} -> {})...",
            transition.from, transition.to
        );

        self.state = MigrationState::Scanning;
        let plan = self.scan(context, source, target).await?;

        self.state = MigrationState::Translating;
        let translated = plan.translate();

        self.state = MigrationState::Creating;
        let mut summary = MigrationSummary::default();
        for object in translated {
            if self.create(context, &object).await? {
                summary.created += 1;
            } else {
                summary.skipped += 1;
            }
        }

        info!(
            "Migrated {source} resources to {target} (created: {}, skipped: {})",
            summary.created, summary.skipped
        );

        Ok(summary)
    }

    async fn scan(
        &self,
        context: &S::Context,
        source: PolicyKind,
        target: PolicyKind,
    ) -> Result<MigrationPlan, MigrationError> {
        let objects = self
            .store
            .list(context, source)
            .await
            .map_err(|source_error| MigrationError::List {
                kind: source,
                source: source_error,
            })?;

        let items = objects
            .iter()
            .map(|object| Ok((PolicyObject::from_dynamic(source, object)?, target)))
            .collect::<Result<Vec<_>, MigrationError>>()?;

        Ok(MigrationPlan { items })
    }

    /// Returns `false` when an existing object was skipped
    async fn create(&self, context: &S::Context, object: &PolicyObject) -> Result<bool, MigrationError> {
        info!(
            "Converting {} to {} '{}/{}'...",
            object.kind.paired(),
            object.kind,
            object.namespace,
            object.name
        );

        let result = self
            .store
            .create(context, object.kind, &object.namespace, &object.to_dynamic())
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(kube::Error::Api(response))
                if response.code == 409 && self.conflict_policy == ConflictPolicy::SkipExisting =>
            {
                warn!(
                    "{} '{}/{}' already exists, skipping!",
                    object.kind, object.namespace, object.name
                );
                Ok(false)
            }
            Err(error) => Err(MigrationError::Create {
                kind: object.kind,
                namespace: object.namespace.clone(),
                name: object.name.clone(),
                source: error,
            }),
        }
    }
}

/// Runs a single migration for `transition` with the given conflict policy.
pub async fn migrate_policies<S: PolicyStore>(
    store: &S,
    context: &S::Context,
    transition: PluginTransition,
    conflict_policy: ConflictPolicy,
) -> Result<MigrationSummary, MigrationError> {
    Migrator::new(store)
        .with_conflict_policy(conflict_policy)
        .run(context, transition)
        .await
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Mutex};

    use async_trait::async_trait;
    use kube::{api::DynamicObject, core::ErrorResponse};
    use serde_json::{json, Value};

    use super::*;

    type Key = (PolicyKind, String, String);

    /// In-memory store that behaves like the API server on duplicates
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<BTreeMap<Key, DynamicObject>>,
        contexts: Mutex<Vec<String>>,
        failing_name: Option<String>,
    }

    impl MemoryStore {
        fn with(objects: Vec<PolicyObject>) -> Self {
            let store = Self::default();
            for object in objects {
                store.insert(&object);
            }

            store
        }

        fn insert(&self, object: &PolicyObject) {
            self.objects.lock().unwrap().insert(
                (object.kind, object.namespace.clone(), object.name.clone()),
                object.to_dynamic(),
            );
        }

        fn of_kind(&self, kind: PolicyKind) -> Vec<PolicyObject> {
            self.objects
                .lock()
                .unwrap()
                .iter()
                .filter(|((object_kind, _, _), _)| *object_kind == kind)
                .map(|(_, object)| PolicyObject::from_dynamic(kind, object).unwrap())
                .collect()
        }
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_owned(),
            message: reason.to_owned(),
            reason: reason.to_owned(),
            code,
        })
    }

    #[async_trait]
    impl PolicyStore for MemoryStore {
        type Context = String;

        async fn list(
            &self,
            context: &Self::Context,
            kind: PolicyKind,
        ) -> Result<Vec<DynamicObject>, kube::Error> {
            self.contexts.lock().unwrap().push(context.clone());

            Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|((object_kind, _, _), _)| *object_kind == kind)
                .map(|(_, object)| object.clone())
                .collect())
        }

        async fn create(
            &self,
            context: &Self::Context,
            kind: PolicyKind,
            namespace: &str,
            object: &DynamicObject,
        ) -> Result<(), kube::Error> {
            self.contexts.lock().unwrap().push(context.clone());

            let name = object.metadata.name.clone().unwrap();
            if self.failing_name.as_deref() == Some(name.as_str()) {
                return Err(api_error(500, "InternalError"));
            }

            let mut objects = self.objects.lock().unwrap();
            let key = (kind, namespace.to_owned(), name);
            if objects.contains_key(&key) {
                return Err(api_error(409, "AlreadyExists"));
            }
            objects.insert(key, object.clone());

            Ok(())
        }
    }

    fn two_rule_spec() -> Value {
        json!({
            "egress": [
                { "to": { "dnsName": "docs.openshift.com" }, "type": "Allow" },
                { "to": { "cidrSelector": "8.8.8.8" }, "type": "Deny" },
            ]
        })
    }

    fn policy(kind: PolicyKind, namespace: &str, name: &str) -> PolicyObject {
        PolicyObject {
            kind,
            namespace: namespace.to_owned(),
            name: name.to_owned(),
            spec: two_rule_spec(),
        }
    }

    const SDN_TO_OVN: PluginTransition = PluginTransition {
        from: PluginType::OpenShiftSdn,
        to: PluginType::OvnKubernetes,
    };

    const OVN_TO_SDN: PluginTransition = PluginTransition {
        from: PluginType::OvnKubernetes,
        to: PluginType::OpenShiftSdn,
    };

    #[test]
    fn transition_is_only_reported_on_type_change() {
        assert_eq!(PluginTransition::between(None, PluginType::OvnKubernetes), None);
        assert_eq!(
            PluginTransition::between(Some(PluginType::OvnKubernetes), PluginType::OvnKubernetes),
            None
        );
        assert_eq!(
            PluginTransition::between(Some(PluginType::OpenShiftSdn), PluginType::OvnKubernetes),
            Some(SDN_TO_OVN)
        );
    }

    #[tokio::test]
    async fn migrates_egress_network_policy_to_egress_firewall() {
        let store = MemoryStore::with(vec![policy(PolicyKind::EgressNetworkPolicy, "n1", "default")]);
        let mut migrator = Migrator::new(&store);

        let summary = migrator.run(&"ctx".to_owned(), SDN_TO_OVN).await.unwrap();

        assert_eq!(summary, MigrationSummary { created: 1, skipped: 0 });
        assert_eq!(migrator.state(), MigrationState::Done);
        assert_eq!(
            store.of_kind(PolicyKind::EgressFirewall),
            vec![policy(PolicyKind::EgressFirewall, "n1", "default")]
        );
    }

    #[tokio::test]
    async fn migrates_egress_firewall_to_egress_network_policy() {
        let store = MemoryStore::with(vec![
            policy(PolicyKind::EgressFirewall, "n1", "default"),
            policy(PolicyKind::EgressFirewall, "n2", "default"),
        ]);

        migrate_policies(&store, &"ctx".to_owned(), OVN_TO_SDN, ConflictPolicy::Fail)
            .await
            .unwrap();

        assert_eq!(
            store.of_kind(PolicyKind::EgressNetworkPolicy),
            vec![
                policy(PolicyKind::EgressNetworkPolicy, "n1", "default"),
                policy(PolicyKind::EgressNetworkPolicy, "n2", "default"),
            ]
        );
    }

    #[tokio::test]
    async fn migration_runs_in_one_direction_only() {
        let store = MemoryStore::with(vec![
            policy(PolicyKind::EgressNetworkPolicy, "n1", "sdn"),
            policy(PolicyKind::EgressFirewall, "n1", "ovn"),
        ]);

        migrate_policies(&store, &"ctx".to_owned(), SDN_TO_OVN, ConflictPolicy::Fail)
            .await
            .unwrap();

        assert_eq!(store.of_kind(PolicyKind::EgressNetworkPolicy).len(), 1);
        assert_eq!(store.of_kind(PolicyKind::EgressFirewall).len(), 2);
    }

    #[tokio::test]
    async fn rerun_fails_on_duplicates_by_default() {
        let store = MemoryStore::with(vec![policy(PolicyKind::EgressNetworkPolicy, "n1", "default")]);
        migrate_policies(&store, &"ctx".to_owned(), SDN_TO_OVN, ConflictPolicy::Fail)
            .await
            .unwrap();

        let mut migrator = Migrator::new(&store);
        let result = migrator.run(&"ctx".to_owned(), SDN_TO_OVN).await;

        assert_eq!(migrator.state(), MigrationState::Failed);
        match result {
            Err(MigrationError::Create {
                kind,
                namespace,
                name,
                source: kube::Error::Api(response),
            }) => {
                assert_eq!(kind, PolicyKind::EgressFirewall);
                assert_eq!((namespace.as_str(), name.as_str()), ("n1", "default"));
                assert_eq!(response.code, 409);
            }
            other => panic!("expected a creation conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rerun_skips_duplicates_when_asked_to() {
        let store = MemoryStore::with(vec![
            policy(PolicyKind::EgressNetworkPolicy, "n1", "default"),
            policy(PolicyKind::EgressNetworkPolicy, "n2", "default"),
            policy(PolicyKind::EgressFirewall, "n1", "default"),
        ]);

        let summary =
            migrate_policies(&store, &"ctx".to_owned(), SDN_TO_OVN, ConflictPolicy::SkipExisting)
                .await
                .unwrap();

        assert_eq!(summary, MigrationSummary { created: 1, skipped: 1 });
        assert_eq!(store.of_kind(PolicyKind::EgressFirewall).len(), 2);
    }

    #[tokio::test]
    async fn failed_creation_aborts_the_batch_without_rollback() {
        let store = MemoryStore {
            failing_name: Some("b".to_owned()),
            ..MemoryStore::with(vec![
                policy(PolicyKind::EgressNetworkPolicy, "n1", "a"),
                policy(PolicyKind::EgressNetworkPolicy, "n1", "b"),
                policy(PolicyKind::EgressNetworkPolicy, "n1", "c"),
            ])
        };

        let result =
            migrate_policies(&store, &"ctx".to_owned(), SDN_TO_OVN, ConflictPolicy::SkipExisting).await;

        assert!(matches!(
            result,
            Err(MigrationError::Create { ref name, .. }) if name == "b"
        ));
        assert_eq!(
            store.of_kind(PolicyKind::EgressFirewall),
            vec![policy(PolicyKind::EgressFirewall, "n1", "a")]
        );
    }

    #[tokio::test]
    async fn context_is_handed_to_every_call() {
        let store = MemoryStore::with(vec![
            policy(PolicyKind::EgressFirewall, "n1", "a"),
            policy(PolicyKind::EgressFirewall, "n2", "b"),
        ]);

        migrate_policies(&store, &"reconcile-42".to_owned(), OVN_TO_SDN, ConflictPolicy::Fail)
            .await
            .unwrap();

        assert_eq!(*store.contexts.lock().unwrap(), vec!["reconcile-42"; 3]);
    }

    #[tokio::test]
    async fn nameless_objects_stop_the_scan() {
        let store = MemoryStore::default();
        store.objects.lock().unwrap().insert(
            (PolicyKind::EgressNetworkPolicy, "n1".to_owned(), "x".to_owned()),
            DynamicObject::new("x", &PolicyKind::EgressNetworkPolicy.api_resource()),
        );
        let mut migrator = Migrator::new(&store);

        let result = migrator.run(&"ctx".to_owned(), SDN_TO_OVN).await;

        assert!(matches!(
            result,
            Err(MigrationError::MissingMetadata {
                kind: PolicyKind::EgressNetworkPolicy
            })
        ));
        assert_eq!(migrator.state(), MigrationState::Failed);
        assert!(store.of_kind(PolicyKind::EgressFirewall).is_empty());
    }
}
