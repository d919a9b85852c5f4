// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP tests driven through the router without a network listener.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use ringlet_core::types::{FetchStatus, LifecycleState};
use ringlet_gateway::{GatewayState, ServerConfig, build_router};
use ringlet_test_utils::TestHarness;
use serde_json::{Value, json};
use tower::ServiceExt;

fn router_for(harness: &TestHarness, bearer_token: Option<&str>) -> Router {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        bearer_token: bearer_token.map(str::to_string),
    };
    let state = GatewayState {
        cache: harness.cache.clone(),
        fetcher: harness.fetcher.clone(),
        dispatcher: harness.dispatcher.clone(),
        runner: harness.runner.clone(),
        storage: harness.storage.clone(),
        tracker: harness.tracker.clone(),
        start_time: std::time::Instant::now(),
    };
    build_router(&config, state)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, Some("secret"));

    let (status, body) = send(&router, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn v1_routes_require_bearer_token_when_configured() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, Some("secret"));

    let (status, _) = send(&router, get_request("/v1/calls")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/v1/calls")
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, authed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 0);
}

#[tokio::test]
async fn webhook_acks_immediately_and_caches_partial_result() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let event = json!({
        "type": "call.completed",
        "call_id": "call-web-1",
        "status": "ended",
        "transcript": "partial transcript from webhook",
        "metadata": {"provider_name": "Apex", "phone": "+15550000001"}
    });
    let (status, body) = send(&router, json_request("POST", "/v1/events/calls", event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    // Processing is detached; wait for it to settle. The mock backend has no
    // such record, so enrichment exhausts and the partial data survives.
    harness.drain().await;
    let snapshot = harness.cache.get("call-web-1").await.expect("cached entry");
    assert_eq!(snapshot.completeness, FetchStatus::FetchFailed);
    assert_eq!(
        snapshot.transcript.as_deref(),
        Some("partial transcript from webhook")
    );
}

#[tokio::test]
async fn irrelevant_webhook_subtypes_are_acknowledged_without_action() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let event = json!({
        "type": "call.transcript.delta",
        "call_id": "call-web-2"
    });
    let (status, body) = send(&router, json_request("POST", "/v1/events/calls", event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    harness.drain().await;
    assert!(harness.cache.get("call-web-2").await.is_none());
}

#[tokio::test]
async fn call_lookup_returns_snapshot_or_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let (status, _) = send(&router, get_request("/v1/calls/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let event = json!({
        "type": "call.completed",
        "call_id": "call-web-3",
        "status": "ended"
    });
    send(&router, json_request("POST", "/v1/events/calls", event)).await;
    harness.drain().await;

    let (status, body) = send(&router, get_request("/v1/calls/call-web-3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call_id"], "call-web-3");
}

#[tokio::test]
async fn cache_admin_delete_removes_entry() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let event = json!({"type": "call.completed", "call_id": "call-web-4", "status": "ended"});
    send(&router, json_request("POST", "/v1/events/calls", event)).await;
    harness.drain().await;

    let delete = Request::builder()
        .method("DELETE")
        .uri("/v1/calls/call-web-4")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(harness.cache.get("call-web-4").await.is_none());

    let delete_again = Request::builder()
        .method("DELETE")
        .uri("/v1/calls/call-web-4")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, delete_again).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_dispatch_returns_full_batch_result() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let body = json!({
        "requests": [
            {
                "provider_name": "Apex",
                "phone": "+15550000001",
                "service_type": "plumbing",
                "problem": "leaking sink",
                "address": "12 Canal St"
            }
        ],
        "max_concurrent": 3
    });
    let (status, body) = send(&router, json_request("POST", "/v1/dispatch", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["results"][0]["status"], "completed");
}

#[tokio::test]
async fn empty_dispatch_batch_is_a_validation_error() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let (status, body) =
        send(&router, json_request("POST", "/v1/dispatch", json!({"requests": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn async_dispatch_returns_accepted_ticket() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let body = json!({
        "requests": [
            {
                "provider_name": "Apex",
                "phone": "+15550000001",
                "service_type": "plumbing",
                "problem": "leaking sink",
                "address": "12 Canal St",
                "request_id": "req-async-1"
            }
        ]
    });
    let (status, body) = send(&router, json_request("POST", "/v1/dispatch/async", body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!body["execution_id"].as_str().unwrap().is_empty());
    assert_eq!(body["items"], 1);
    assert_eq!(body["status_location"], "/v1/requests/req-async-1/status");
}

#[tokio::test]
async fn full_request_flow_via_http_surface() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    // Create the request; lifecycle runs in the background.
    let create = json!({
        "service_type": "plumbing",
        "description": "leaking kitchen sink",
        "urgency": "high",
        "address": "12 Canal St",
        "providers": [
            {"name": "Apex Plumbing", "phone": "+15550000001"},
            {"name": "Budget Pipes", "phone": "+15550000002"}
        ]
    });
    let (status, body) = send(&router, json_request("POST", "/v1/requests", create)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let request_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["state"], "pending");

    harness
        .wait_for_state(&request_id, LifecycleState::Recommended)
        .await;

    // Status polling reflects the terminal provider calls.
    let (status, body) =
        send(&router, get_request(&format!("/v1/requests/{request_id}/status"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "recommended");
    assert_eq!(body["counts"]["terminal"], 2);

    // The audit log recorded the transitions.
    let (status, body) =
        send(&router, get_request(&format!("/v1/requests/{request_id}/log"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["entries"].as_array().unwrap().len() >= 4);

    // Selecting by rank advances to booking.
    let (status, body) = send(
        &router,
        json_request(
            "POST",
            &format!("/v1/requests/{request_id}/select"),
            json!({"rank": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "booking");

    // A second selection while booking is in flight is rejected.
    let (status, _) = send(
        &router,
        json_request(
            "POST",
            &format!("/v1/requests/{request_id}/select"),
            json!({"rank": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    harness.wait_for_state(&request_id, LifecycleState::Completed).await;
}

#[tokio::test]
async fn selection_for_unknown_request_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let router = router_for(&harness, None);

    let (status, _) = send(
        &router,
        json_request("POST", "/v1/requests/ghost/select", json!({"rank": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
