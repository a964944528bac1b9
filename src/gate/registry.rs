//! Gate registration.
//!
//! Each protected kind gets one [`SingletonGate`] served under the route
//! derived from its identity. Registration is keyed by that route, so
//! registering the same kind twice replaces the earlier gate.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use kube::Client;
use kube::Resource;
use tracing::{debug, info};

use crate::error::Result;
use crate::gate::identity::ResourceIdentity;
use crate::gate::server::{WebhookState, gate_router};
use crate::gate::singleton::SingletonGate;
use crate::gate::store::{InstanceLister, KubeLister};
use crate::health::HealthState;

/// Route-keyed set of gates served by one webhook server
pub struct GateRegistry<L = KubeLister> {
    gates: BTreeMap<String, Arc<SingletonGate<L>>>,
}

impl<L> Default for GateRegistry<L> {
    fn default() -> Self {
        Self {
            gates: BTreeMap::new(),
        }
    }
}

impl<L: InstanceLister> GateRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate under its derived route and return the route.
    pub fn register(&mut self, gate: SingletonGate<L>) -> String {
        let route = gate.route();
        let identity = gate.identity().to_string();
        if self.gates.insert(route.clone(), Arc::new(gate)).is_some() {
            debug!(route = %route, kind = %identity, "Replaced existing gate registration");
        } else {
            info!(route = %route, kind = %identity, "Registered singleton gate");
        }
        route
    }

    pub fn get(&self, route: &str) -> Option<&Arc<SingletonGate<L>>> {
        self.gates.get(route)
    }

    /// Registered routes in sorted order
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.gates.keys().map(String::as_str)
    }

    pub fn identities(&self) -> impl Iterator<Item = &ResourceIdentity> {
        self.gates.values().map(|gate| gate.identity())
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Build the webhook router with one POST route per gate.
    pub fn into_router(self, health: Option<Arc<HealthState>>) -> Router {
        if let Some(health) = &health {
            health.metrics.set_gates_registered(self.gates.len() as i64);
        }

        self.gates
            .into_values()
            .fold(Router::new(), |router, gate| {
                router.merge(gate_router(Arc::new(WebhookState {
                    gate,
                    health: health.clone(),
                })))
            })
    }
}

impl GateRegistry<KubeLister> {
    /// Register a gate for a statically typed resource.
    pub fn setup<K>(&mut self, client: Client) -> String
    where
        K: Resource<DynamicType = ()>,
    {
        self.register(SingletonGate::for_resource::<K>(client))
    }

    /// Resolve `identity` through discovery and register a gate for it.
    ///
    /// Fails if the API server does not serve the kind.
    pub async fn setup_discovered(
        &mut self,
        client: Client,
        identity: ResourceIdentity,
    ) -> Result<String> {
        let gate = SingletonGate::discover(client, identity).await?;
        Ok(self.register(gate))
    }
}
