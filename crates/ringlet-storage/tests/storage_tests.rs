// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite storage layer.
//!
//! Each test opens an isolated temp database so tests are independent and
//! order-insensitive.

use chrono::Utc;
use ringlet_config::model::StorageConfig;
use ringlet_core::Storage;
use ringlet_core::types::{
    CallResult, CallStatus, DispatchMethod, InteractionLogEntry, LifecycleState, LogStatus,
    ProviderCall, RankedProvider, ServiceRequest, Urgency,
};
use ringlet_storage::SqliteStorage;
use tempfile::TempDir;

async fn open_storage() -> (TempDir, SqliteStorage) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("test.db");
    let storage = SqliteStorage::new(StorageConfig {
        database_path: db_path.to_string_lossy().to_string(),
        wal_mode: true,
    });
    storage.initialize().await.expect("initialize storage");
    (temp_dir, storage)
}

fn sample_request(id: &str) -> ServiceRequest {
    ServiceRequest {
        id: id.to_string(),
        service_type: "plumbing".to_string(),
        description: "leaking kitchen sink".to_string(),
        urgency: Urgency::High,
        address: "12 Canal St".to_string(),
        state: LifecycleState::Pending,
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
async fn service_request_round_trips() {
    let (_guard, storage) = open_storage().await;
    let request = sample_request("req-1");
    storage.create_service_request(&request).await.unwrap();

    let loaded = storage
        .get_service_request("req-1")
        .await
        .unwrap()
        .expect("request should exist");
    assert_eq!(loaded.service_type, "plumbing");
    assert_eq!(loaded.urgency, Urgency::High);
    assert_eq!(loaded.state, LifecycleState::Pending);
    assert!(loaded.recommendations.is_none());

    assert!(storage.get_service_request("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn state_transition_persists_outcome_only_when_given() {
    let (_guard, storage) = open_storage().await;
    storage
        .create_service_request(&sample_request("req-2"))
        .await
        .unwrap();

    storage
        .update_request_state("req-2", LifecycleState::Searching, None)
        .await
        .unwrap();
    storage
        .update_request_state("req-2", LifecycleState::Failed, Some("all provider calls failed"))
        .await
        .unwrap();

    let loaded = storage.get_service_request("req-2").await.unwrap().unwrap();
    assert_eq!(loaded.state, LifecycleState::Failed);
    assert_eq!(loaded.outcome.as_deref(), Some("all provider calls failed"));

    // An update without an outcome must not clear the recorded cause.
    storage
        .update_request_state("req-2", LifecycleState::Failed, None)
        .await
        .unwrap();
    let loaded = storage.get_service_request("req-2").await.unwrap().unwrap();
    assert_eq!(loaded.outcome.as_deref(), Some("all provider calls failed"));
}

#[tokio::test]
async fn updating_missing_request_errors() {
    let (_guard, storage) = open_storage().await;
    let err = storage
        .update_request_state("nope", LifecycleState::Searching, None)
        .await
        .expect_err("missing request should error");
    assert!(format!("{err}").contains("storage error"));
}

#[tokio::test]
async fn recommendations_and_selection_round_trip() {
    let (_guard, storage) = open_storage().await;
    storage
        .create_service_request(&sample_request("req-3"))
        .await
        .unwrap();

    let recommendations = vec![
        RankedProvider {
            rank: 1,
            provider_name: "Apex Plumbing".to_string(),
            phone: "+15550000001".to_string(),
            provider_id: Some("apex".to_string()),
            reason: "available today, quoted $120".to_string(),
            estimate: Some("$120".to_string()),
        },
        RankedProvider {
            rank: 2,
            provider_name: "Budget Pipes".to_string(),
            phone: "+15550000002".to_string(),
            provider_id: None,
            reason: "available tomorrow".to_string(),
            estimate: None,
        },
    ];
    storage
        .save_recommendations("req-3", &recommendations)
        .await
        .unwrap();
    storage.save_selection("req-3", "Apex Plumbing").await.unwrap();
    storage
        .save_appointment("req-3", "Apex Plumbing", Some("tuesday"), Some("2pm"))
        .await
        .unwrap();

    let loaded = storage.get_service_request("req-3").await.unwrap().unwrap();
    let recs = loaded.recommendations.expect("recommendations saved");
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].provider_name, "Apex Plumbing");
    assert_eq!(loaded.selected_provider.as_deref(), Some("Apex Plumbing"));
    assert_eq!(loaded.appointment_date.as_deref(), Some("tuesday"));
    assert_eq!(loaded.appointment_time.as_deref(), Some("2pm"));
}

#[tokio::test]
async fn provider_call_status_advances_by_call_id() {
    let (_guard, storage) = open_storage().await;
    let now = Utc::now();
    let call = ProviderCall {
        request_id: "req-4".to_string(),
        provider_name: "Apex Plumbing".to_string(),
        phone: "+15550000001".to_string(),
        provider_id: None,
        call_id: None,
        status: CallStatus::Queued,
        dispatched_at: now,
        updated_at: now,
    };
    storage.upsert_provider_call(&call).await.unwrap();

    // Re-upsert with the backend call id once the call is placed.
    let placed = ProviderCall {
        call_id: Some("call-abc".to_string()),
        status: CallStatus::InProgress,
        ..call
    };
    storage.upsert_provider_call(&placed).await.unwrap();

    storage
        .update_provider_call_status("call-abc", CallStatus::Completed)
        .await
        .unwrap();

    let calls = storage.list_provider_calls("req-4").await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id.as_deref(), Some("call-abc"));
    assert_eq!(calls[0].status, CallStatus::Completed);

    // Unknown call ids are a silent no-op.
    storage
        .update_provider_call_status("unknown", CallStatus::Failed)
        .await
        .unwrap();
}

#[tokio::test]
async fn call_result_upsert_replaces_with_enriched_data() {
    let (_guard, storage) = open_storage().await;
    let mut result = CallResult::partial(
        "call-1",
        "Apex Plumbing",
        "+15550000001",
        CallStatus::Completed,
        DispatchMethod::Direct,
    );
    storage.save_call_result(&result).await.unwrap();

    result.transcript = Some("Yes, we can come Tuesday at 2pm.".to_string());
    result.completeness = ringlet_core::FetchStatus::Complete;
    result.enriched_at = Some(Utc::now());
    storage.save_call_result(&result).await.unwrap();

    let loaded = storage.get_call_result("call-1").await.unwrap().unwrap();
    assert_eq!(loaded.completeness, ringlet_core::FetchStatus::Complete);
    assert!(loaded.transcript.unwrap().contains("Tuesday"));
    assert!(loaded.enriched_at.is_some());
}

#[tokio::test]
async fn interaction_log_appends_in_order() {
    let (_guard, storage) = open_storage().await;
    for (step, status) in [
        ("searching", LogStatus::Info),
        ("calling", LogStatus::Success),
        ("ranking", LogStatus::Warning),
    ] {
        storage
            .append_log(&InteractionLogEntry::new("req-5", step, format!("{step} detail"), status))
            .await
            .unwrap();
    }
    storage
        .append_log(
            &InteractionLogEntry::new("req-5", "booking", "booked", LogStatus::Success)
                .with_call_id("call-9"),
        )
        .await
        .unwrap();

    let entries = storage.list_log("req-5").await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].step, "searching");
    assert_eq!(entries[2].status, LogStatus::Warning);
    assert_eq!(entries[3].call_id.as_deref(), Some("call-9"));

    assert!(storage.list_log("other").await.unwrap().is_empty());
}
