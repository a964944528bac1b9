// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for highlander.
//!
//! Uses proptest to generate random identities and namespace contents and
//! verify the gate's invariants.

#[path = "../common/mod.rs"]
mod common;

use proptest::prelude::*;

use highlander::gate::Operation;
use highlander::{GateRequest, ResourceIdentity, SingletonGate, Verdict};

use common::{MockStore, widget};

/// Strategy for DNS-style API groups (possibly the core group).
fn any_group() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}",
    ]
}

/// Strategy for API versions.
fn any_version() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("v1".to_string()),
        Just("v1beta1".to_string()),
        Just("v2alpha1".to_string()),
    ]
}

/// Strategy for CamelCase kinds.
fn any_kind() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,10}([A-Z][a-z]{1,6})?"
}

/// Strategy for non-create operations.
fn non_create() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Update),
        Just(Operation::Delete),
        Just(Operation::Connect),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime")
        .block_on(future)
}

proptest! {
    /// Route derivation is a pure function of the identity.
    #[test]
    fn route_is_deterministic(group in any_group(), version in any_version(), kind in any_kind()) {
        let a = ResourceIdentity::new(group.clone(), version.clone(), kind.clone());
        let b = ResourceIdentity::new(group, version, kind);
        prop_assert_eq!(a.route(), b.route());
    }

    /// Distinct kinds in one group never share a route.
    #[test]
    fn distinct_kinds_get_distinct_routes(
        group in any_group(),
        version in any_version(),
        kind_a in any_kind(),
        kind_b in any_kind(),
    ) {
        prop_assume!(kind_a.to_lowercase() != kind_b.to_lowercase());
        let a = ResourceIdentity::new(group.clone(), version.clone(), kind_a);
        let b = ResourceIdentity::new(group, version, kind_b);
        prop_assert_ne!(a.route(), b.route());
    }

    /// Routes contain no dots and a lower-case kind.
    #[test]
    fn route_shape(group in any_group(), version in any_version(), kind in any_kind()) {
        let route = ResourceIdentity::new(group, version, kind.clone()).route();
        prop_assert!(!route.contains('.'));
        let suffix = format!("-{}", kind.to_lowercase());
        prop_assert!(route.ends_with(&suffix));
    }

    /// Textual identities parse back to themselves.
    #[test]
    fn identity_text_round_trip(group in any_group(), version in any_version(), kind in any_kind()) {
        let identity = ResourceIdentity::new(group, version, kind);
        let parsed: ResourceIdentity = identity.to_string().parse().unwrap();
        prop_assert_eq!(parsed, identity);
    }

    /// A create is denied iff at least one instance is not being deleted.
    #[test]
    fn deny_iff_live_instance(terminating in proptest::collection::vec(any::<bool>(), 0..8)) {
        let store = MockStore::new();
        for (i, is_terminating) in terminating.iter().enumerate() {
            let name = format!("w{}", i);
            if *is_terminating {
                store.add_terminating("team-a", &name);
            } else {
                store.add("team-a", &name);
            }
        }
        let gate = SingletonGate::with_lister(widget(), store);

        let verdict = block_on(gate.decide(&GateRequest::create(widget().to_gvk(), "team-a")));
        let expect_deny = terminating.iter().any(|t| !t);
        prop_assert_eq!(verdict.is_denied(), expect_deny);
        prop_assert_eq!(verdict.is_allowed(), !expect_deny);
    }

    /// Non-create operations are allowed whatever the namespace holds.
    #[test]
    fn non_create_always_allowed(operation in non_create(), live in 0usize..4) {
        let store = MockStore::new();
        for i in 0..live {
            store.add("team-a", &format!("w{}", i));
        }
        let gate = SingletonGate::with_lister(widget(), store.clone());
        let request = GateRequest {
            operation,
            kind: widget().to_gvk(),
            namespace: Some("team-a".to_string()),
        };

        let verdict = block_on(gate.decide(&request));
        prop_assert!(matches!(verdict, Verdict::Allow));
        prop_assert_eq!(store.lists(), 0);
    }

    /// Requests for any other kind are allowed without consulting the store.
    #[test]
    fn foreign_kinds_always_allowed(group in any_group(), version in any_version(), kind in any_kind()) {
        let other = ResourceIdentity::new(group, version, kind);
        prop_assume!(other != widget());

        let store = MockStore::new();
        store.add("team-a", "w1");
        let gate = SingletonGate::with_lister(widget(), store.clone());

        let verdict = block_on(gate.decide(&GateRequest::create(other.to_gvk(), "team-a")));
        prop_assert!(verdict.is_allowed());
        prop_assert_eq!(store.lists(), 0);
    }
}
