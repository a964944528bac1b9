//! The singleton admission gate.
//!
//! A [`SingletonGate`] is bound to one [`ResourceIdentity`] and answers CREATE
//! requests for that kind: a create is denied while another instance that is
//! not being deleted exists in the same namespace.
//!
//! The check is read-then-decide with no locking. Two concurrent creates in an
//! empty namespace can both be admitted; callers needing strict exclusivity
//! must also rely on a fixed object name or another store-level constraint.

use std::time::{Duration, Instant};

use kube::Client;
use kube::Resource;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, Operation};
use kube::core::{ApiResource, GroupVersionKind};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::gate::identity::ResourceIdentity;
use crate::gate::store::{InstanceLister, KubeLister};
use crate::gate::verdict::Verdict;

/// The parts of an admission request the gate reads
#[derive(Clone, Debug)]
pub struct GateRequest {
    pub operation: Operation,
    pub kind: GroupVersionKind,
    /// Namespace of the candidate object, `None` for cluster-scoped kinds
    pub namespace: Option<String>,
}

impl GateRequest {
    pub fn create(kind: GroupVersionKind, namespace: impl Into<String>) -> Self {
        Self {
            operation: Operation::Create,
            kind,
            namespace: Some(namespace.into()),
        }
    }
}

impl From<&AdmissionRequest<DynamicObject>> for GateRequest {
    fn from(request: &AdmissionRequest<DynamicObject>) -> Self {
        let namespace = request.namespace.clone().or_else(|| {
            request
                .object
                .as_ref()
                .and_then(|obj| obj.metadata.namespace.clone())
        });
        Self {
            operation: request.operation.clone(),
            kind: request.kind.clone(),
            namespace,
        }
    }
}

/// Admission gate allowing at most one live instance of a kind per namespace
pub struct SingletonGate<L = KubeLister> {
    identity: ResourceIdentity,
    resource: ApiResource,
    lister: L,
}

impl SingletonGate<KubeLister> {
    /// Gate for a statically typed resource.
    pub fn for_resource<K>(client: Client) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self::new(
            ResourceIdentity::of::<K>(),
            ApiResource::erase::<K>(&()),
            KubeLister::new(client),
        )
    }

    /// Gate for a kind named at runtime, resolved through API discovery.
    pub async fn discover(client: Client, identity: ResourceIdentity) -> Result<Self> {
        let resource = identity.discover(&client).await?;
        Ok(Self::new(identity, resource, KubeLister::new(client)))
    }
}

impl<L: InstanceLister> SingletonGate<L> {
    pub fn new(identity: ResourceIdentity, resource: ApiResource, lister: L) -> Self {
        Self {
            identity,
            resource,
            lister,
        }
    }

    /// Gate over a custom lister; the plural is guessed from the kind.
    pub fn with_lister(identity: ResourceIdentity, lister: L) -> Self {
        let resource = identity.guess_api_resource();
        Self::new(identity, resource, lister)
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// Route this gate is served under.
    pub fn route(&self) -> String {
        self.identity.route()
    }

    /// Decide an admission request.
    ///
    /// Dropping the returned future aborts the in-flight list call.
    pub async fn handle(&self, request: &AdmissionRequest<DynamicObject>) -> Verdict {
        self.decide(&GateRequest::from(request)).await
    }

    /// Decide an admission request within the caller's deadline.
    ///
    /// When `timeout` elapses first the list is aborted and the verdict is
    /// [`Error::Cancelled`]. `None` waits for the list to finish.
    pub async fn handle_with_timeout(
        &self,
        request: &AdmissionRequest<DynamicObject>,
        timeout: Option<Duration>,
    ) -> Verdict {
        let Some(timeout) = timeout else {
            return self.handle(request).await;
        };

        match tokio::time::timeout(timeout, self.handle(request)).await {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!(
                    uid = %request.uid,
                    kind = %self.identity,
                    timeout_ms = timeout.as_millis() as u64,
                    "Admission deadline exceeded while listing instances"
                );
                Verdict::Error(Error::Cancelled(format!(
                    "deadline of {:?} exceeded while listing {}",
                    timeout, self.identity
                )))
            }
        }
    }

    /// Decide a pre-extracted request.
    pub async fn decide(&self, request: &GateRequest) -> Verdict {
        // Only creation is constrained
        if request.operation != Operation::Create {
            return Verdict::Allow;
        }

        // Misrouted request for a kind this gate does not own
        if !self.identity.matches(&request.kind) {
            debug!(
                kind = %ResourceIdentity::from(request.kind.clone()),
                bound = %self.identity,
                "Ignoring request for a different kind"
            );
            return Verdict::Allow;
        }

        self.evaluate(request.namespace.as_deref()).await
    }

    /// The enforcement check: one list, then decide.
    async fn evaluate(&self, namespace: Option<&str>) -> Verdict {
        let started = Instant::now();
        let snapshot = match self.lister.list(&self.resource, namespace).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    namespace = namespace.unwrap_or(""),
                    kind = %self.identity,
                    error = %e,
                    "Failed to list objects in namespace"
                );
                return Verdict::Error(Error::Query(e));
            }
        };

        debug!(
            namespace = namespace.unwrap_or(""),
            kind = %self.identity,
            instances = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Listed existing instances"
        );

        match snapshot.first_live() {
            Some(existing) => {
                debug!(
                    namespace = namespace.unwrap_or(""),
                    existing = existing.name.as_deref().unwrap_or(""),
                    "Live instance already present"
                );
                Verdict::only_one()
            }
            // Empty, or every instance is being deleted (replacement in progress)
            None => Verdict::Allow,
        }
    }
}
