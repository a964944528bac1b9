//! Read-only view of the object store.
//!
//! The gate only needs to know which instances of its kind exist in a
//! namespace and whether each is being deleted, so the store seam lists
//! object metadata and nothing else.

use std::future::Future;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::Client;
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::ApiResource;

/// One stored instance of the protected kind
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instance {
    pub name: Option<String>,
    /// Set by the API server once deletion was requested and finalizers are pending
    pub deletion_timestamp: Option<Time>,
}

impl Instance {
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone(),
            deletion_timestamp: meta.deletion_timestamp.clone(),
        }
    }

    pub fn is_terminating(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}

/// Point-in-time list of instances in one namespace, in store order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceSnapshot {
    pub instances: Vec<Instance>,
}

impl InstanceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// First instance that is not being deleted, if any.
    pub fn first_live(&self) -> Option<&Instance> {
        self.instances.iter().find(|i| !i.is_terminating())
    }
}

impl FromIterator<Instance> for InstanceSnapshot {
    fn from_iter<I: IntoIterator<Item = Instance>>(iter: I) -> Self {
        Self {
            instances: iter.into_iter().collect(),
        }
    }
}

/// Lists stored instances of a kind.
///
/// `namespace == None` lists across the whole cluster, which is what a
/// cluster-scoped kind needs.
pub trait InstanceLister: Send + Sync + 'static {
    fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> impl Future<Output = Result<InstanceSnapshot, kube::Error>> + Send;
}

/// [`InstanceLister`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl InstanceLister for KubeLister {
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
    ) -> Result<InstanceSnapshot, kube::Error> {
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        };

        // Metadata is all the decision needs
        let list = api.list_metadata(&ListParams::default()).await?;
        Ok(list
            .items
            .iter()
            .map(|obj| Instance::from_meta(&obj.metadata))
            .collect())
    }
}
