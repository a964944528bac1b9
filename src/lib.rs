//! highlander library crate
//!
//! A validating admission webhook that allows at most one live instance of a
//! resource kind per namespace. Each protected kind is served by a
//! [`SingletonGate`] registered in a [`GateRegistry`].

pub mod config;
pub mod error;
pub mod gate;
pub mod health;

pub use config::Config;
pub use error::{Error, Result};
pub use gate::{
    GateRegistry, GateRequest, ResourceIdentity, SingletonGate, THERE_CAN_BE_ONLY_ONE, Verdict,
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, run_webhook_server,
};
pub use health::HealthState;
