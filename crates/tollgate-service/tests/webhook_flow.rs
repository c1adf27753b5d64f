//! End-to-end webhook emission tests: ledger operations through the API
//! produce signed deliveries at the configured endpoint.

mod common;

use std::time::Duration;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate_store::Store;
use tollgate_webhook::{verify_signature, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};

/// Wait until the mock server has seen `count` requests (delivery runs on a
/// spawned task).
async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap();
        if requests.len() >= count {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("endpoint did not receive {count} webhook deliveries in time");
}

#[tokio::test]
async fn consume_emits_signed_webhook() {
    let endpoint = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&endpoint)
        .await;

    let harness = TestHarness::with_webhook_target(Some(endpoint.uri()));
    let account_id = harness.create_account(0).await;
    harness.grant(&account_id, 100, "fund-1").await;

    harness
        .server
        .post("/v1/credits/consume")
        .add_header("x-api-key", &harness.service_api_key)
        .json(&json!({
            "account_id": account_id,
            "amount": 30,
            "reason": "api usage",
            "idempotency_key": "consume-hook-1",
        }))
        .await
        .assert_status_ok();

    // Grant + consume both emit.
    let requests = wait_for_requests(&endpoint, 2).await;

    let consumed = requests
        .iter()
        .find_map(|req| {
            let body = String::from_utf8(req.body.clone()).ok()?;
            let envelope: serde_json::Value = serde_json::from_str(&body).ok()?;
            (envelope["type"] == "credits.consumed").then_some((req, body, envelope))
        })
        .expect("no credits.consumed delivery");
    let (request, body, envelope) = consumed;

    assert_eq!(envelope["data"]["account_id"], account_id.as_str());
    assert_eq!(envelope["data"]["amount"], 30);
    assert_eq!(envelope["data"]["balance_after"], 70);

    let signature = request
        .headers
        .get(SIGNATURE_HEADER)
        .expect("missing signature header")
        .to_str()
        .unwrap();
    assert!(verify_signature(
        "whsec_test",
        &body,
        signature,
        DEFAULT_TOLERANCE_SECS,
    ));
}

#[tokio::test]
async fn duplicate_consume_does_not_emit_again() {
    let endpoint = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&endpoint)
        .await;

    let harness = TestHarness::with_webhook_target(Some(endpoint.uri()));
    let account_id = harness.create_account(0).await;
    harness.grant(&account_id, 100, "fund-1").await;

    for _ in 0..3 {
        harness
            .server
            .post("/v1/credits/consume")
            .add_header("x-api-key", &harness.service_api_key)
            .json(&json!({
                "account_id": account_id,
                "amount": 30,
                "reason": "api usage",
                "idempotency_key": "consume-hook-dup",
            }))
            .await
            .assert_status_ok();
    }

    // One grant + one consume; the replays are silent.
    let requests = wait_for_requests(&endpoint, 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = endpoint.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(after.len(), 2);
}

#[tokio::test]
async fn failed_delivery_lands_on_the_queue_for_retry() {
    let endpoint = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&endpoint)
        .await;

    let harness = TestHarness::with_webhook_target(Some(endpoint.uri()));
    let account_id = harness.create_account(0).await;
    harness.grant(&account_id, 100, "fund-1").await;

    wait_for_requests(&endpoint, 1).await;

    // Give the dispatcher a moment to persist the failure outcome.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let dead = harness.store.list_dead_letters(10).unwrap();
    assert!(dead.is_empty(), "first failure must not dead-letter");
}
