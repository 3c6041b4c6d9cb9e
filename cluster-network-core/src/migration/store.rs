use async_trait::async_trait;
use kube::{
    api::{DynamicObject, ListParams, PostParams},
    Api, Client,
};

use crate::resources::policy::PolicyKind;

/// Listing and creation of policy objects. `Context` belongs to the caller:
/// the migrator hands it to every call without looking at it.
#[async_trait]
pub trait PolicyStore: Sync {
    type Context: Send + Sync;

    /// Every object of `kind`, across all namespaces
    async fn list(
        &self,
        context: &Self::Context,
        kind: PolicyKind,
    ) -> Result<Vec<DynamicObject>, kube::Error>;

    async fn create(
        &self,
        context: &Self::Context,
        kind: PolicyKind,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<(), kube::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct KubeStoreContext {
    pub list_params: ListParams,
    pub post_params: PostParams,
}

pub struct KubePolicyStore {
    client: Client,
}

impl KubePolicyStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyStore for KubePolicyStore {
    type Context = KubeStoreContext;

    async fn list(
        &self,
        context: &Self::Context,
        kind: PolicyKind,
    ) -> Result<Vec<DynamicObject>, kube::Error> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &kind.api_resource());

        Ok(api.list(&context.list_params).await?.items)
    }

    async fn create(
        &self,
        context: &Self::Context,
        kind: PolicyKind,
        namespace: &str,
        object: &DynamicObject,
    ) -> Result<(), kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource());

        api.create(&context.post_params, object).await?;

        Ok(())
    }
}
