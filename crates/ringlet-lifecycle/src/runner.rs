// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request lifecycle state machine.
//!
//! One background task owns a service request's advancement at a time: the
//! `active` guard rejects duplicate triggers instead of queueing them. Every
//! transition is persisted and appended to the interaction log; a transition
//! that cannot be persisted fails the request, while audit-side failures are
//! logged and swallowed.

use std::sync::Arc;

use dashmap::DashMap;
use ringlet_config::model::LifecycleConfig;
use ringlet_core::types::{
    BatchOptions, CallRequest, CallResult, CallStatus, InteractionLogEntry, LifecycleState,
    LogStatus, ProviderCall, RankedProvider, ServiceRequest,
};
use ringlet_core::{Notifier, RankingOracle, RingletError, Storage};
use ringlet_dispatch::CallDispatcher;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::heuristic::infer_confirmation;

/// How a caller names the chosen provider in a selection signal.
#[derive(Debug, Clone)]
pub enum ProviderSelection {
    ByName(String),
    /// 1-based rank within the recommendation set.
    ByRank(usize),
}

/// Drives service requests through
/// `PENDING -> SEARCHING -> CALLING -> ANALYZING -> RECOMMENDED -> BOOKING ->
/// {COMPLETED | FAILED}`.
pub struct LifecycleRunner {
    storage: Arc<dyn Storage>,
    dispatcher: Arc<CallDispatcher>,
    ranker: Arc<dyn RankingOracle>,
    notifier: Arc<dyn Notifier>,
    config: LifecycleConfig,
    dispatch_concurrency: usize,
    tracker: TaskTracker,
    /// Advance lock: request ids with a lifecycle task currently in flight.
    active: DashMap<String, ()>,
}

impl LifecycleRunner {
    pub fn new(
        storage: Arc<dyn Storage>,
        dispatcher: Arc<CallDispatcher>,
        ranker: Arc<dyn RankingOracle>,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
        dispatch_concurrency: usize,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            ranker,
            notifier,
            config,
            dispatch_concurrency,
            tracker,
            active: DashMap::new(),
        }
    }

    /// Starts the background lifecycle run for a freshly created request.
    ///
    /// The caller-facing request thread never blocks on the run itself; it
    /// only observes the acknowledged `PENDING` request. A panic inside the
    /// run is contained and recorded as a `FAILED` outcome.
    pub fn start(
        self: &Arc<Self>,
        request: ServiceRequest,
        candidates: Vec<CallRequest>,
    ) -> Result<(), RingletError> {
        let request_id = request.id.clone();
        if self.active.insert(request_id.clone(), ()).is_some() {
            return Err(RingletError::Conflict(format!(
                "lifecycle already running for request {request_id}"
            )));
        }

        let runner = self.clone();
        self.tracker.spawn(async move {
            let inner = {
                let runner = runner.clone();
                let request_id = request_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = runner.run(request, candidates).await {
                        error!(request_id, error = %e, "lifecycle run failed");
                        runner
                            .fail_request(&request_id, &format!("internal error: {e}"))
                            .await;
                    }
                })
            };
            if let Err(join_err) = inner.await
                && join_err.is_panic()
            {
                error!(request_id, "lifecycle run panicked");
                runner
                    .fail_request(&request_id, "internal error: lifecycle task panicked")
                    .await;
            }
            runner.active.remove(&request_id);
        });
        Ok(())
    }

    /// SEARCHING through RECOMMENDED.
    async fn run(
        &self,
        request: ServiceRequest,
        candidates: Vec<CallRequest>,
    ) -> Result<(), RingletError> {
        let request_id = request.id.clone();
        // advance() records the failure itself; a transition that could not
        // be persisted ends the run without a second outcome write.
        if self
            .advance(
                &request_id,
                LifecycleState::Searching,
                "searching",
                "candidate providers received",
                LogStatus::Info,
            )
            .await
            .is_err()
        {
            return Ok(());
        }

        if candidates.is_empty() {
            self.fail_request(&request_id, "no candidate providers found").await;
            return Ok(());
        }

        // Stamp every candidate with the parent request for status rows.
        let candidates: Vec<CallRequest> = candidates
            .into_iter()
            .map(|mut c| {
                c.request_id = Some(request_id.clone());
                c
            })
            .collect();

        let options = BatchOptions {
            max_concurrent: self.dispatch_concurrency,
            urgency: request.urgency,
        };
        let ticket = match self
            .dispatcher
            .dispatch_batch_async(candidates.clone(), options)
            .await
        {
            Ok(ticket) => ticket,
            Err(e) => {
                self.fail_request(&request_id, &format!("call dispatch failed: {e}")).await;
                return Ok(());
            }
        };
        info!(
            request_id,
            execution_id = ticket.execution_id,
            providers = ticket.items,
            "provider calls dispatched"
        );

        if self
            .advance(
                &request_id,
                LifecycleState::Calling,
                "calling",
                &format!("calling {} providers", ticket.items),
                LogStatus::Info,
            )
            .await
            .is_err()
        {
            return Ok(());
        }

        // Gate: advance only when every dispatched provider is terminal.
        let rows = match self.wait_for_terminal_calls(&request_id).await {
            Some(rows) => rows,
            None => {
                self.fail_request(&request_id, "timed out waiting for provider calls to complete")
                    .await;
                return Ok(());
            }
        };

        let successes = rows.iter().filter(|r| r.status == CallStatus::Completed).count();
        if successes == 0 {
            let first_error = rows
                .iter()
                .map(|r| format!("{}: {}", r.provider_name, r.status))
                .next()
                .unwrap_or_else(|| "no calls dispatched".to_string());
            self.fail_request(
                &request_id,
                &format!("all provider calls failed ({first_error})"),
            )
            .await;
            return Ok(());
        }

        if self
            .advance(
                &request_id,
                LifecycleState::Analyzing,
                "analyzing",
                &format!("{successes} of {} calls completed", rows.len()),
                LogStatus::Success,
            )
            .await
            .is_err()
        {
            return Ok(());
        }

        let results = self.collect_results(&rows).await;
        let recommendations = match self.ranker.rank(&request, &results).await {
            Ok(ranked) if !ranked.is_empty() => ranked,
            Ok(_) | Err(_) => {
                self.fail_request(&request_id, "no recommendations available from ranking")
                    .await;
                return Ok(());
            }
        };

        if let Err(e) = self
            .storage
            .save_recommendations(&request_id, &recommendations)
            .await
        {
            self.fail_request(&request_id, &format!("storage error saving recommendations: {e}"))
                .await;
            return Ok(());
        }

        if self
            .advance(
                &request_id,
                LifecycleState::Recommended,
                "recommended",
                &format!("{} providers ranked", recommendations.len()),
                LogStatus::Success,
            )
            .await
            .is_err()
        {
            return Ok(());
        }

        // Best-effort: a notification failure never reverts the transition.
        if let Some(updated) = self.storage.get_service_request(&request_id).await.ok().flatten() {
            let message = format!(
                "We called {} providers for your {} request. Top option: {}. Reply with your choice to book.",
                rows.len(),
                updated.service_type,
                recommendations[0].provider_name
            );
            if let Err(e) = self.notifier.notify(&updated, &message).await {
                warn!(request_id, error = %e, "recommendation notification failed");
            }
        }

        Ok(())
    }

    /// Handles a selection signal: `RECOMMENDED -> BOOKING`, then dispatches
    /// the booking call in the background.
    ///
    /// Duplicate signals (a second selection while one is in flight) are
    /// rejected with a conflict error, not queued.
    pub async fn select_provider(
        self: &Arc<Self>,
        request_id: &str,
        selection: ProviderSelection,
    ) -> Result<ServiceRequest, RingletError> {
        if self.active.insert(request_id.to_string(), ()).is_some() {
            return Err(RingletError::Conflict(format!(
                "an advancement is already in flight for request {request_id}"
            )));
        }
        // Any early return below must release the advance lock.
        let result = self.begin_booking(request_id, selection).await;
        if result.is_err() {
            self.active.remove(request_id);
        }
        result
    }

    async fn begin_booking(
        self: &Arc<Self>,
        request_id: &str,
        selection: ProviderSelection,
    ) -> Result<ServiceRequest, RingletError> {
        let request = self
            .storage
            .get_service_request(request_id)
            .await?
            .ok_or_else(|| RingletError::NotFound(format!("service request {request_id}")))?;

        if request.state != LifecycleState::Recommended {
            return Err(RingletError::InvalidTransition {
                request_id: request_id.to_string(),
                from: request.state.to_string(),
                to: LifecycleState::Booking.to_string(),
            });
        }

        let recommendations = request.recommendations.clone().unwrap_or_default();
        let provider = match &selection {
            ProviderSelection::ByName(name) => recommendations
                .iter()
                .find(|r| r.provider_name.eq_ignore_ascii_case(name)),
            ProviderSelection::ByRank(rank) => {
                recommendations.iter().find(|r| r.rank == *rank)
            }
        }
        .cloned()
        .ok_or_else(|| {
            RingletError::NotFound(format!(
                "selected provider is not in the recommendation set for {request_id}"
            ))
        })?;

        if let Err(e) = self.storage.save_selection(request_id, &provider.provider_name).await {
            self.fail_request(request_id, &format!("storage error saving selection: {e}")).await;
            return Err(e);
        }
        self.advance(
            request_id,
            LifecycleState::Booking,
            "booking",
            &format!("booking call to {}", provider.provider_name),
            LogStatus::Info,
        )
        .await?;

        let runner = self.clone();
        let request_id_owned = request_id.to_string();
        let booking_request = request.clone();
        self.tracker.spawn(async move {
            let inner = {
                let runner = runner.clone();
                let request_id = request_id_owned.clone();
                tokio::spawn(async move {
                    runner.run_booking(&request_id, booking_request, provider).await;
                })
            };
            if let Err(join_err) = inner.await
                && join_err.is_panic()
            {
                error!(request_id = request_id_owned, "booking task panicked");
                runner
                    .revert_to_recommended(&request_id_owned, "internal error during booking")
                    .await;
            }
            runner.active.remove(&request_id_owned);
        });

        self.storage
            .get_service_request(request_id)
            .await?
            .ok_or_else(|| RingletError::NotFound(format!("service request {request_id}")))
    }

    /// BOOKING through COMPLETED (or back to RECOMMENDED).
    async fn run_booking(
        &self,
        request_id: &str,
        request: ServiceRequest,
        provider: RankedProvider,
    ) {
        let booking_call = CallRequest {
            provider_name: provider.provider_name.clone(),
            phone: provider.phone.clone(),
            provider_id: provider.provider_id.clone(),
            service_type: request.service_type.clone(),
            problem: request.description.clone(),
            urgency: request.urgency,
            address: request.address.clone(),
            prompt_override: Some(format!(
                "Call {} to book an appointment for the customer's {} issue: {}. \
                 Agree on a concrete day and time.",
                provider.provider_name, request.service_type, request.description
            )),
            request_id: Some(request_id.to_string()),
        };

        let options = BatchOptions {
            max_concurrent: 1,
            urgency: request.urgency,
        };
        if let Err(e) = self
            .dispatcher
            .dispatch_batch_async(vec![booking_call], options)
            .await
        {
            warn!(request_id, error = %e, "booking call dispatch failed");
            self.revert_to_recommended(request_id, &format!("booking call dispatch failed: {e}"))
                .await;
            return;
        }

        // Long poll: booking calls may take minutes to complete.
        let row = self
            .wait_for_booking_call(request_id, &provider.phone)
            .await;
        let Some(row) = row else {
            self.fail_request(request_id, "booking call timed out").await;
            return;
        };

        if row.status != CallStatus::Completed {
            self.revert_to_recommended(
                request_id,
                &format!("booking call ended with status {}", row.status),
            )
            .await;
            return;
        }

        let result = match &row.call_id {
            Some(call_id) => self.storage.get_call_result(call_id).await.ok().flatten(),
            None => None,
        };
        let (confirmed_flag, transcript, structured) = match &result {
            Some(r) => (
                structured_bool(r, "booking_confirmed"),
                r.transcript.clone().unwrap_or_default(),
                r.analysis.as_ref().and_then(|a| a.structured.clone()),
            ),
            None => (false, String::new(), None),
        };

        let inference = infer_confirmation(confirmed_flag, &transcript);
        if !inference.confirmed {
            self.revert_to_recommended(request_id, "booking was not confirmed on the call").await;
            return;
        }

        // Structured fields win; heuristic extraction backfills gaps.
        let date = structured_str(&structured, "appointment_date").or(inference.date);
        let time = structured_str(&structured, "appointment_time").or(inference.time);

        if let Err(e) = self
            .storage
            .save_appointment(request_id, &provider.provider_name, date.as_deref(), time.as_deref())
            .await
        {
            self.fail_request(request_id, &format!("storage error saving appointment: {e}"))
                .await;
            return;
        }
        if self
            .advance(
                request_id,
                LifecycleState::Completed,
                "completed",
                &format!(
                    "booked {} for {} {}",
                    provider.provider_name,
                    date.as_deref().unwrap_or("(date tbd)"),
                    time.as_deref().unwrap_or("")
                ),
                LogStatus::Success,
            )
            .await
            .is_err()
        {
            return;
        }

        if let Some(updated) = self.storage.get_service_request(request_id).await.ok().flatten() {
            let message = format!(
                "Your appointment with {} is confirmed{}.",
                provider.provider_name,
                match (&date, &time) {
                    (Some(d), Some(t)) => format!(" for {d} at {t}"),
                    (Some(d), None) => format!(" for {d}"),
                    _ => String::new(),
                }
            );
            if let Err(e) = self.notifier.notify(&updated, &message).await {
                warn!(request_id, error = %e, "confirmation notification failed");
            }
        }
    }

    /// Polls per-provider statuses until all are terminal.
    ///
    /// Returns `None` when the poll window expires first.
    async fn wait_for_terminal_calls(&self, request_id: &str) -> Option<Vec<ProviderCall>> {
        let interval = std::time::Duration::from_millis(self.config.poll_interval_ms);
        for attempt in 1..=self.config.poll_max_attempts {
            match self.storage.list_provider_calls(request_id).await {
                Ok(rows) if !rows.is_empty() && rows.iter().all(|r| r.status.is_terminal()) => {
                    debug!(request_id, attempt, "all provider calls terminal");
                    return Some(rows);
                }
                Ok(rows) => {
                    let terminal = rows.iter().filter(|r| r.status.is_terminal()).count();
                    debug!(request_id, attempt, terminal, total = rows.len(), "calls still in flight");
                }
                Err(e) => {
                    warn!(request_id, attempt, error = %e, "status poll failed");
                }
            }
            tokio::time::sleep(interval).await;
        }
        None
    }

    /// Polls for the booking call row reaching a terminal status.
    async fn wait_for_booking_call(
        &self,
        request_id: &str,
        phone: &str,
    ) -> Option<ProviderCall> {
        let interval =
            std::time::Duration::from_millis(self.config.booking_poll_interval_ms);
        for _attempt in 1..=self.config.booking_poll_max_attempts {
            if let Ok(rows) = self.storage.list_provider_calls(request_id).await
                && let Some(row) = rows
                    .iter()
                    .find(|r| r.phone == phone && r.status.is_terminal())
            {
                return Some(row.clone());
            }
            tokio::time::sleep(interval).await;
        }
        None
    }

    /// Loads the durable result for each terminal call, synthesizing a
    /// minimal result from the status row when persistence lagged behind.
    async fn collect_results(&self, rows: &[ProviderCall]) -> Vec<CallResult> {
        let mut results = Vec::new();
        for row in rows {
            let Some(ref call_id) = row.call_id else {
                continue;
            };
            match self.storage.get_call_result(call_id).await {
                Ok(Some(result)) => results.push(result),
                Ok(None) | Err(_) => {
                    let mut fallback = CallResult::partial(
                        call_id.clone(),
                        row.provider_name.clone(),
                        row.phone.clone(),
                        row.status,
                        ringlet_core::DispatchMethod::Direct,
                    );
                    fallback.request_id = Some(row.request_id.clone());
                    results.push(fallback);
                }
            }
        }
        results
    }

    /// Persists a transition and appends the audit entry.
    ///
    /// The state write is mandatory: on failure the request is failed with a
    /// storage-error outcome. The log append is best-effort.
    async fn advance(
        &self,
        request_id: &str,
        to: LifecycleState,
        step: &str,
        detail: &str,
        log_status: LogStatus,
    ) -> Result<(), RingletError> {
        if let Err(e) = self.storage.update_request_state(request_id, to, None).await {
            error!(request_id, state = %to, error = %e, "failed to persist state transition");
            self.fail_request(request_id, &format!("storage error persisting transition: {e}"))
                .await;
            return Err(e);
        }
        info!(request_id, state = %to, detail, "lifecycle transition");
        self.append_log(request_id, step, detail, log_status).await;
        Ok(())
    }

    /// Terminal failure: records the outcome string and the audit entry.
    ///
    /// Bypasses graph validation on purpose: a request must be failable from
    /// any non-terminal situation, including half-persisted ones.
    async fn fail_request(&self, request_id: &str, outcome: &str) {
        warn!(request_id, outcome, "service request failed");
        if let Err(e) = self
            .storage
            .update_request_state(request_id, LifecycleState::Failed, Some(outcome))
            .await
        {
            error!(request_id, error = %e, "failed to persist FAILED state");
        }
        self.append_log(request_id, "failed", outcome, LogStatus::Error).await;
    }

    /// Backward edge: booking did not confirm, return the request to the
    /// recommendation stage so the user can pick another candidate.
    async fn revert_to_recommended(&self, request_id: &str, reason: &str) {
        warn!(request_id, reason, "reverting to recommended");
        if let Err(e) = self
            .storage
            .update_request_state(request_id, LifecycleState::Recommended, None)
            .await
        {
            error!(request_id, error = %e, "failed to persist revert to RECOMMENDED");
            self.fail_request(request_id, &format!("storage error reverting booking: {e}"))
                .await;
            return;
        }
        self.append_log(request_id, "booking", reason, LogStatus::Warning).await;
    }

    /// Appends an interaction log entry, logging (not propagating) failure.
    async fn append_log(&self, request_id: &str, step: &str, detail: &str, status: LogStatus) {
        let entry = InteractionLogEntry::new(request_id, step, detail, status);
        if let Err(e) = self.storage.append_log(&entry).await {
            warn!(request_id, step, error = %e, "failed to append interaction log entry");
        }
    }
}

/// Reads a boolean field from the result's structured analysis block.
fn structured_bool(result: &CallResult, field: &str) -> bool {
    result
        .analysis
        .as_ref()
        .and_then(|a| a.structured.as_ref())
        .and_then(|s| s.get(field))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Reads a string field from a structured analysis block.
fn structured_str(structured: &Option<serde_json::Value>, field: &str) -> Option<String> {
    structured
        .as_ref()
        .and_then(|s| s.get(field))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
