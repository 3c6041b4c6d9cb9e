use cluster_network_core::migration::store::KubePolicyStore;
use kube::Client;

use crate::release::OperatorRelease;

pub struct ReconcilerContext {
    pub client: Client,
    pub release: OperatorRelease,
    pub policy_store: KubePolicyStore,
}

impl ReconcilerContext {
    pub fn new(client: Client, release: OperatorRelease) -> Self {
        Self {
            policy_store: KubePolicyStore::new(client.clone()),
            client,
            release,
        }
    }
}
