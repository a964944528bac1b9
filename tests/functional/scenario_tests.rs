//! Create / deny / replace sequences against one namespace.

use highlander::THERE_CAN_BE_ONLY_ONE;

use crate::common::{AdmissionReviewBuilder, TEAM_A};
use crate::{Harness, allowed, code, message};

fn create(name: &str) -> serde_json::Value {
    AdmissionReviewBuilder::create(name).namespace(TEAM_A).build_json()
}

#[tokio::test]
async fn test_widget_lifecycle() {
    let harness = Harness::widget();

    // Empty namespace: first Widget is admitted
    let response = harness.admit(create("w1")).await;
    assert!(allowed(&response));
    assert!(message(&response).is_empty());

    // w1 now exists: a second Widget is denied with the fixed reason
    harness.store.add(TEAM_A, "w1");
    let response = harness.admit(create("w2")).await;
    assert!(!allowed(&response));
    assert_eq!(message(&response), THERE_CAN_BE_ONLY_ONE);
    assert_eq!(code(&response), 403);

    // w1 is being deleted: its replacement is admitted
    harness.store.mark_terminating(TEAM_A, "w1");
    let response = harness.admit(create("w2")).await;
    assert!(allowed(&response));
}

#[tokio::test]
async fn test_replacement_then_third_create_is_denied() {
    let harness = Harness::widget();
    harness.store.add_terminating(TEAM_A, "w1");
    harness.store.add(TEAM_A, "w2");

    let response = harness.admit(create("w3")).await;
    assert!(!allowed(&response));
    assert_eq!(message(&response), THERE_CAN_BE_ONLY_ONE);
}

#[tokio::test]
async fn test_namespaces_are_independent() {
    let harness = Harness::widget();
    harness.store.add("team-b", "w1");

    let response = harness.admit(create("w1")).await;
    assert!(allowed(&response));

    let review = AdmissionReviewBuilder::create("w2")
        .namespace("team-b")
        .build_json();
    let response = harness.admit(review).await;
    assert!(!allowed(&response));
}

#[tokio::test]
async fn test_non_create_operations_are_allowed() {
    let harness = Harness::widget();
    harness.store.add(TEAM_A, "w1");

    for operation in ["UPDATE", "DELETE", "CONNECT"] {
        let review = AdmissionReviewBuilder::create("w1")
            .operation(operation)
            .build_json();
        let response = harness.admit(review).await;
        assert!(allowed(&response), "{} should be allowed", operation);
    }
    assert_eq!(harness.store.lists(), 0);
}

#[tokio::test]
async fn test_purged_instance_frees_the_namespace() {
    let harness = Harness::widget();
    harness.store.add(TEAM_A, "w1");
    assert!(!allowed(&harness.admit(create("w2")).await));

    harness.store.remove(TEAM_A, "w1");
    assert!(allowed(&harness.admit(create("w2")).await));
}

#[tokio::test]
async fn test_response_echoes_request_uid() {
    let harness = Harness::widget();
    let review = AdmissionReviewBuilder::create("w1")
        .uid("c0ffee00-0000-4000-8000-000000000001")
        .build_json();
    let response = harness.admit(review).await;
    assert_eq!(response["uid"], "c0ffee00-0000-4000-8000-000000000001");
}

#[tokio::test]
async fn test_decisions_are_counted() {
    let harness = Harness::widget();
    harness.admit(create("w1")).await;
    harness.store.add(TEAM_A, "w1");
    harness.admit(create("w2")).await;

    let metrics = harness.health.metrics.encode();
    assert!(metrics.contains("verdict=\"allowed\""));
    assert!(metrics.contains("verdict=\"denied\""));
    assert!(metrics.contains("kind=\"apps.example.io/v1/Widget\""));
}
