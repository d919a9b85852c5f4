// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the flow engine client, using wiremock.

use std::sync::Arc;

use chrono::Utc;
use ringlet_config::model::FlowConfig;
use ringlet_core::types::{
    BatchOptions, CallRequest, CallStatus, HealthStatus, LifecycleState, ServiceRequest, Urgency,
};
use ringlet_core::{ExecutionBackend, RankingOracle};
use ringlet_flow::{FlowBackend, FlowClient, FlowRanker};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Arc<FlowClient> {
    let config = FlowConfig {
        base_url: server.uri(),
        api_key: None,
        health_timeout_ms: 500,
        batch_timeout_secs: 5,
    };
    Arc::new(FlowClient::from_config(&config).unwrap().expect("client configured"))
}

fn request(phone: &str) -> CallRequest {
    CallRequest {
        provider_name: "Apex Plumbing".to_string(),
        phone: phone.to_string(),
        provider_id: None,
        service_type: "plumbing".to_string(),
        problem: "leaking sink".to_string(),
        urgency: Urgency::Normal,
        address: "12 Canal St".to_string(),
        prompt_override: None,
        request_id: Some("req-1".to_string()),
    }
}

fn service_request() -> ServiceRequest {
    ServiceRequest {
        id: "req-1".to_string(),
        service_type: "plumbing".to_string(),
        description: "leaking sink".to_string(),
        urgency: Urgency::Normal,
        address: "12 Canal St".to_string(),
        state: LifecycleState::Analyzing,
        selected_provider: None,
        recommendations: None,
        outcome: None,
        appointment_date: None,
        appointment_time: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn empty_base_url_disables_flow_client() {
    let config = FlowConfig::default();
    assert!(FlowClient::from_config(&config).unwrap().is_none());
}

#[tokio::test]
async fn run_batch_converts_engine_results_and_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/flows/call-batch"))
        .and(body_partial_json(json!({"max_concurrent": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "call_id": "call-1",
                    "provider_name": "Apex Plumbing",
                    "phone": "+15550000001",
                    "status": "completed",
                    "duration_seconds": 61.0,
                    "transcript": "We can come Tuesday.",
                    "summary": "available tuesday"
                },
                {
                    "call_id": "call-2",
                    "provider_name": "Budget Pipes",
                    "phone": "+15550000002",
                    "status": "no_answer"
                }
            ],
            "errors": [
                {
                    "provider_name": "Bad Number Co",
                    "phone": "bad",
                    "message": "rejected by carrier"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = FlowBackend::new(client_for(&server));
    let batch = backend
        .run_batch(
            &[request("+15550000001"), request("+15550000002")],
            &BatchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(batch.completed, 1);
    assert_eq!(batch.no_answer, 1);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.results[0].status, CallStatus::Completed);
    assert!(batch.results[0].analysis.is_some());
}

#[tokio::test]
async fn run_batch_fails_when_engine_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/flows/call-batch"))
        .respond_with(ResponseTemplate::new(500).set_body_string("workflow crashed"))
        .mount(&server)
        .await;

    let backend = FlowBackend::new(client_for(&server));
    let err = backend
        .run_batch(&[request("+15550000001")], &BatchOptions::default())
        .await
        .expect_err("engine failure should surface");
    assert!(format!("{err}").contains("workflow crashed"));
}

#[tokio::test]
async fn ranker_returns_recommendations_when_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/flows/rank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "recommendations": [
                {
                    "rank": 1,
                    "provider_name": "Apex Plumbing",
                    "phone": "+15550000001",
                    "reason": "available today, quoted $120",
                    "estimate": "$120"
                }
            ]
        })))
        .mount(&server)
        .await;

    let ranker = FlowRanker::new(client_for(&server));
    let ranked = ranker.rank(&service_request(), &[]).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].provider_name, "Apex Plumbing");
}

#[tokio::test]
async fn ranker_fails_fast_when_engine_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ranker = FlowRanker::new(client_for(&server));
    let err = ranker
        .rank(&service_request(), &[])
        .await
        .expect_err("unhealthy engine should fail fast");
    assert!(format!("{err}").contains("unhealthy"));

    let health = client_for(&server).health().await.unwrap();
    assert!(matches!(health, HealthStatus::Unhealthy(_)));
}
