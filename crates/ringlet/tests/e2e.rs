// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end lifecycle tests over the complete orchestration stack.
//!
//! Each test creates an isolated TestHarness with temp SQLite, a mock
//! execution backend, and shortened poll windows. Tests are independent and
//! order-insensitive.

use ringlet_core::types::{CallStatus, LifecycleState, LogStatus};
use ringlet_core::{RingletError, Storage};
use ringlet_lifecycle::ProviderSelection;
use ringlet_test_utils::{ScriptedOutcome, TestHarness};

// ---- Happy path: calls complete, ranking succeeds ----

#[tokio::test]
async fn two_completed_calls_reach_recommended_with_ranked_list() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness
        .create_request(&[
            ("Apex Plumbing", "+15550000001"),
            ("Budget Pipes", "+15550000002"),
        ])
        .await
        .unwrap();

    let updated = harness
        .wait_for_state(&request.id, LifecycleState::Recommended)
        .await;
    let recommendations = updated.recommendations.expect("ranked list persisted");
    assert_eq!(recommendations.len(), 2);
    assert_eq!(recommendations[0].rank, 1);

    // A best-effort notification about the recommendations went out.
    harness.drain().await;
    let messages = harness.notifier.messages().await;
    assert!(messages.iter().any(|m| m.contains("Top option")));
}

// ---- All calls fail: short-circuit to FAILED ----

#[tokio::test]
async fn all_failed_calls_short_circuit_to_failed() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.backend.script_status("+15550000001", CallStatus::Error);
    harness.backend.script_status("+15550000002", CallStatus::Error);
    harness.backend.script_status("+15550000003", CallStatus::Error);

    let request = harness
        .create_request(&[
            ("A", "+15550000001"),
            ("B", "+15550000002"),
            ("C", "+15550000003"),
        ])
        .await
        .unwrap();

    let failed = harness.wait_for_state(&request.id, LifecycleState::Failed).await;
    let outcome = failed.outcome.expect("failed state carries an outcome");
    assert!(
        outcome.contains("all provider calls failed"),
        "outcome should name the category, got: {outcome}"
    );
}

// ---- Gate correctness: a slow call keeps the request in CALLING ----

#[tokio::test]
async fn request_stays_in_calling_until_every_call_is_terminal() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.backend.script(
        "+15550000003",
        ScriptedOutcome {
            delay_ms: 400,
            ..Default::default()
        },
    );

    let request = harness
        .create_request(&[
            ("Fast A", "+15550000001"),
            ("Fast B", "+15550000002"),
            ("Slow C", "+15550000003"),
        ])
        .await
        .unwrap();

    // While the slow provider's call is in flight, the gate must hold.
    harness.wait_for_state(&request.id, LifecycleState::Calling).await;
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    let mid = harness
        .storage
        .get_service_request(&request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mid.state, LifecycleState::Calling);

    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;
}

// ---- Poll window exhaustion ----

#[tokio::test]
async fn exhausted_poll_window_fails_with_timeout_outcome() {
    let harness = TestHarness::builder().with_poll_attempts(3).build().await.unwrap();
    harness.backend.script(
        "+15550000001",
        ScriptedOutcome {
            delay_ms: 5_000,
            ..Default::default()
        },
    );

    let request = harness.create_request(&[("Slow", "+15550000001")]).await.unwrap();
    let failed = harness.wait_for_state(&request.id, LifecycleState::Failed).await;
    assert!(failed.outcome.unwrap().contains("timed out"));
}

// ---- Ranking failure ----

#[tokio::test]
async fn ranking_failure_fails_the_request() {
    let harness = TestHarness::builder().with_failing_ranker().build().await.unwrap();
    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();

    let failed = harness.wait_for_state(&request.id, LifecycleState::Failed).await;
    assert!(failed.outcome.unwrap().contains("no recommendations"));
}

// ---- Booking: confirmed by the heuristic ----

#[tokio::test]
async fn confirmed_booking_reaches_completed_with_appointment() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();
    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;

    let booked = harness
        .runner
        .select_provider(&request.id, ProviderSelection::ByRank(1))
        .await
        .unwrap();
    assert_eq!(booked.state, LifecycleState::Booking);
    assert_eq!(booked.selected_provider.as_deref(), Some("Apex"));

    let completed = harness.wait_for_state(&request.id, LifecycleState::Completed).await;
    // The default mock transcript offers "Tuesday at 2pm" and confirms it.
    assert_eq!(completed.appointment_date.as_deref(), Some("tuesday"));
    assert_eq!(completed.appointment_time.as_deref(), Some("2pm"));

    harness.drain().await;
    let messages = harness.notifier.messages().await;
    assert!(messages.iter().any(|m| m.contains("confirmed")));
}

// ---- Booking: not confirmed, revert to RECOMMENDED ----

#[tokio::test]
async fn unconfirmed_booking_reverts_to_recommended() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.backend.script(
        "+15550000001",
        ScriptedOutcome {
            transcript: Some(
                "Sorry, we are fully booked this week and not available.".to_string(),
            ),
            ..Default::default()
        },
    );

    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();
    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;

    harness
        .runner
        .select_provider(&request.id, ProviderSelection::ByRank(1))
        .await
        .unwrap();

    // The booking call completes but the heuristic finds no confirmation.
    harness.drain().await;
    let reverted = harness
        .storage
        .get_service_request(&request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reverted.state, LifecycleState::Recommended);
    assert!(reverted.appointment_date.is_none());

    // The revert reason landed in the interaction log.
    let log = harness.storage.list_log(&request.id).await.unwrap();
    assert!(
        log.iter()
            .any(|e| e.status == LogStatus::Warning && e.detail.contains("not confirmed"))
    );
}

// ---- At-most-one advancement under duplicate selection ----

#[tokio::test]
async fn duplicate_selection_signals_dispatch_exactly_one_booking_call() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();
    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;
    let placed_before_booking = harness.backend.calls_placed();

    let first = {
        let runner = harness.runner.clone();
        let id = request.id.clone();
        tokio::spawn(async move { runner.select_provider(&id, ProviderSelection::ByRank(1)).await })
    };
    let second = {
        let runner = harness.runner.clone();
        let id = request.id.clone();
        tokio::spawn(async move { runner.select_provider(&id, ProviderSelection::ByRank(1)).await })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(accepted, 1, "exactly one selection must win");
    assert!(
        outcomes
            .iter()
            .any(|o| matches!(o, Err(RingletError::Conflict(_)) | Err(RingletError::InvalidTransition { .. }))),
        "the loser must be rejected, not queued"
    );

    harness.drain().await;
    assert_eq!(
        harness.backend.calls_placed(),
        placed_before_booking + 1,
        "exactly one booking call may be dispatched"
    );
}

// ---- Duplicate lifecycle start ----

#[tokio::test]
async fn second_lifecycle_start_for_same_request_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();

    let duplicate = harness.runner.start(request.clone(), Vec::new());
    assert!(matches!(duplicate, Err(RingletError::Conflict(_))));

    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;
}

// ---- Empty candidate list ----

#[tokio::test]
async fn request_without_candidates_fails_with_named_cause() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness.create_request(&[]).await.unwrap();

    let failed = harness.wait_for_state(&request.id, LifecycleState::Failed).await;
    assert!(failed.outcome.unwrap().contains("no candidate providers"));
}

// ---- Interaction log is appended across transitions ----

#[tokio::test]
async fn lifecycle_appends_interaction_log_entries() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = harness.create_request(&[("Apex", "+15550000001")]).await.unwrap();
    harness.wait_for_state(&request.id, LifecycleState::Recommended).await;

    let log = harness.storage.list_log(&request.id).await.unwrap();
    let steps: Vec<&str> = log.iter().map(|e| e.step.as_str()).collect();
    for expected in ["searching", "calling", "analyzing", "recommended"] {
        assert!(steps.contains(&expected), "log missing step {expected}: {steps:?}");
    }
}
