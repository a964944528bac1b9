//! Router harness: one registry over a shared `MockStore`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use highlander::{GateRegistry, HealthState, ResourceIdentity, SingletonGate};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::common::MockStore;

/// A webhook router plus handles on its store and metrics.
pub struct Harness {
    pub router: Router,
    pub store: MockStore,
    pub health: Arc<HealthState>,
}

impl Harness {
    /// Serve gates for `identities`, all reading from one store.
    pub fn new(identities: &[ResourceIdentity]) -> Self {
        let store = MockStore::new();
        let health = Arc::new(HealthState::new());
        let mut registry = GateRegistry::new();
        for identity in identities {
            registry.register(SingletonGate::with_lister(identity.clone(), store.clone()));
        }
        let router = registry.into_router(Some(health.clone()));
        Self {
            router,
            store,
            health,
        }
    }

    /// Serve a single Widget gate.
    pub fn widget() -> Self {
        Self::new(&[crate::common::widget()])
    }

    /// POST a review to `uri` and return the HTTP status and JSON body.
    pub async fn post(&self, uri: &str, review: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(review.to_string()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// POST a review to the Widget route and return the `response` object.
    pub async fn admit(&self, review: Value) -> Value {
        let (status, body) = self.post(&crate::common::widget().route(), review).await;
        assert_eq!(status, StatusCode::OK, "unexpected HTTP status: {}", body);
        body["response"].clone()
    }
}

/// Whether an admission `response` object allowed the request.
pub fn allowed(response: &Value) -> bool {
    response["allowed"].as_bool().unwrap_or(false)
}

/// The status message of an admission `response` object.
pub fn message(response: &Value) -> &str {
    response["status"]["message"].as_str().unwrap_or("")
}

/// The status code of an admission `response` object.
pub fn code(response: &Value) -> u64 {
    response["status"]["code"].as_u64().unwrap_or(0)
}
