//! Singleton admission gate.
//!
//! - `identity`: the protected (group, version, kind) and its webhook route
//! - `store`: read-only listing of existing instances
//! - `singleton`: the create-time enforcement check
//! - `verdict`: decision type and its admission response mapping
//! - `registry` / `server`: serving gates over HTTPS

pub mod identity;
pub mod registry;
mod server;
pub mod singleton;
pub mod store;
pub mod verdict;

pub use identity::{ROUTE_PREFIX, ResourceIdentity};
pub use registry::GateRegistry;
pub use server::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookParams, WebhookState, gate_router,
    parse_timeout, run_webhook_server,
};
pub use singleton::{GateRequest, SingletonGate};
pub use store::{Instance, InstanceLister, InstanceSnapshot, KubeLister};
pub use verdict::{THERE_CAN_BE_ONLY_ONE, Verdict};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
