// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Ringlet workspace.
//!
//! The call-side types ([`CallRequest`], [`CallResult`], [`BatchResult`])
//! describe one outbound call batch; the request-side types
//! ([`ServiceRequest`], [`LifecycleState`], [`InteractionLogEntry`]) track a
//! user's end-to-end service request through the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Urgency of a service request, carried through to call prompts and ranking.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Emergency,
}

/// Status of one outbound call.
///
/// `Queued` and `InProgress` are transient; every other variant is terminal
/// (no further state change for that call is expected).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    NoAnswer,
    Voicemail,
    Busy,
    Timeout,
    Error,
}

impl CallStatus {
    /// Returns `true` once no further state change for this call is expected.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CallStatus::Queued | CallStatus::InProgress)
    }
}

/// Data-readiness marker for a cached call result.
///
/// Completeness is monotone: once a record reaches `Complete` it never
/// regresses to `Partial` or `Fetching`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchStatus {
    Partial,
    Fetching,
    Complete,
    FetchFailed,
}

/// Which execution backend carried out a call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchMethod {
    /// The flow engine ran the batch.
    Flow,
    /// The dispatcher executed items directly against the voice backend.
    Direct,
}

/// Identity and context for one provider call. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Display name of the provider being called.
    pub provider_name: String,
    /// Phone number in E.164 form.
    pub phone: String,
    /// Stable provider identifier, when the caller has one.
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Service category (e.g. "plumbing").
    pub service_type: String,
    /// Free-text problem description read to the provider.
    pub problem: String,
    #[serde(default)]
    pub urgency: Urgency,
    /// Service address or location hint.
    pub address: String,
    /// Scripted prompt override; when absent the backend's default script is used.
    #[serde(default)]
    pub prompt_override: Option<String>,
    /// Parent service request this call belongs to, if any.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Analysis block produced by the call backend for a completed call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallAnalysis {
    /// Short natural-language summary of the call.
    #[serde(default)]
    pub summary: Option<String>,
    /// Free-form structured fields extracted from the conversation.
    #[serde(default)]
    pub structured: Option<serde_json::Value>,
    /// Backend's own judgement of whether the call met its goal.
    #[serde(default)]
    pub success_evaluation: Option<String>,
}

impl CallAnalysis {
    /// Returns `true` when the analysis carries no data at all.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.structured.is_none() && self.success_evaluation.is_none()
    }
}

/// Outcome of one outbound call.
///
/// Created on first webhook notification with whatever data the event
/// carried, then enriched in place by the background fetcher. Completeness
/// never regresses once `Complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    /// Opaque id assigned by the voice backend to this call attempt.
    pub call_id: String,
    /// Parent service request, when known.
    #[serde(default)]
    pub request_id: Option<String>,
    pub provider_name: String,
    pub phone: String,
    pub status: CallStatus,
    pub method: DispatchMethod,
    /// Call duration in seconds, when reported.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Backend's reason string for why the call ended.
    #[serde(default)]
    pub ended_reason: Option<String>,
    /// Full transcript text, when available.
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub analysis: Option<CallAnalysis>,
    /// Call cost in USD, when reported.
    #[serde(default)]
    pub cost: Option<f64>,
    pub completeness: FetchStatus,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub enriched_at: Option<DateTime<Utc>>,
}

impl CallResult {
    /// Creates a partial result carrying only what a first notification provides.
    pub fn partial(call_id: impl Into<String>, provider_name: impl Into<String>, phone: impl Into<String>, status: CallStatus, method: DispatchMethod) -> Self {
        Self {
            call_id: call_id.into(),
            request_id: None,
            provider_name: provider_name.into(),
            phone: phone.into(),
            status,
            method,
            duration_secs: None,
            ended_reason: None,
            transcript: None,
            analysis: None,
            cost: None,
            completeness: FetchStatus::Partial,
            received_at: Utc::now(),
            enriched_at: None,
        }
    }
}

/// One item that could not be dispatched at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchError {
    pub provider_name: String,
    pub phone: String,
    pub message: String,
}

/// Options for a batch dispatch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrent outbound calls, clamped to `[1, 10]`.
    pub max_concurrent: usize,
    pub urgency: Urgency,
}

impl BatchOptions {
    pub const MIN_CONCURRENT: usize = 1;
    pub const MAX_CONCURRENT: usize = 10;
    pub const DEFAULT_CONCURRENT: usize = 5;

    /// Returns the concurrency bound clamped to the allowed range.
    pub fn clamped_concurrency(&self) -> usize {
        self.max_concurrent
            .clamp(Self::MIN_CONCURRENT, Self::MAX_CONCURRENT)
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: Self::DEFAULT_CONCURRENT,
            urgency: Urgency::Normal,
        }
    }
}

/// Aggregate over one batch dispatch. Derived, not stored long-term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<CallResult>,
    pub completed: usize,
    pub failed: usize,
    pub no_answer: usize,
    pub voicemail: usize,
    /// Busy / timeout / error outcomes not broken out above.
    pub other_terminal: usize,
    /// Items that could not be dispatched at all.
    pub errors: Vec<DispatchError>,
    pub total_duration_secs: f64,
    pub avg_duration_secs: f64,
}

impl BatchResult {
    /// Aggregates per-item results and dispatch errors into batch counts.
    pub fn from_parts(results: Vec<CallResult>, errors: Vec<DispatchError>) -> Self {
        let mut batch = BatchResult {
            errors,
            ..Default::default()
        };
        for result in &results {
            match result.status {
                CallStatus::Completed => batch.completed += 1,
                CallStatus::Failed => batch.failed += 1,
                CallStatus::NoAnswer => batch.no_answer += 1,
                CallStatus::Voicemail => batch.voicemail += 1,
                CallStatus::Busy | CallStatus::Timeout | CallStatus::Error => {
                    batch.other_terminal += 1
                }
                CallStatus::Queued | CallStatus::InProgress => {}
            }
            batch.total_duration_secs += result.duration_secs.unwrap_or(0.0);
        }
        if !results.is_empty() {
            batch.avg_duration_secs = batch.total_duration_secs / results.len() as f64;
        }
        batch.results = results;
        batch
    }
}

/// Lifecycle state of a [`ServiceRequest`].
///
/// The graph is fixed: `Pending -> Searching -> Calling -> Analyzing ->
/// Recommended -> Booking -> {Completed | Failed}`, with two backward edges:
/// `Booking -> Recommended` (booking not confirmed) and any active state
/// `-> Failed` (unrecoverable error or timeout).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    Pending,
    Searching,
    Calling,
    Analyzing,
    Recommended,
    Booking,
    Completed,
    Failed,
}

impl LifecycleState {
    /// Returns `true` for states from which no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Completed | LifecycleState::Failed)
    }

    /// Returns `true` when the state graph permits `self -> to`.
    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (Pending, Searching) => true,
            (Searching, Calling) => true,
            (Calling, Analyzing) => true,
            (Analyzing, Recommended) => true,
            (Recommended, Booking) => true,
            (Booking, Completed) => true,
            // Backward edge: booking call did not confirm.
            (Booking, Recommended) => true,
            // Unrecoverable error or timeout from any active state.
            (Searching | Calling | Analyzing | Booking, Failed) => true,
            _ => false,
        }
    }
}

/// One ranked candidate in a recommendation set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedProvider {
    /// 1-based rank, best first.
    pub rank: usize,
    pub provider_name: String,
    pub phone: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Why this provider was ranked here.
    pub reason: String,
    /// Price estimate quoted on the call, when one was given.
    #[serde(default)]
    pub estimate: Option<String>,
}

/// The umbrella entity tracking one user's request end to end.
///
/// Mutated only by the lifecycle state machine; terminal once `Completed`
/// or `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: String,
    pub service_type: String,
    pub description: String,
    pub urgency: Urgency,
    pub address: String,
    pub state: LifecycleState,
    #[serde(default)]
    pub selected_provider: Option<String>,
    #[serde(default)]
    pub recommendations: Option<Vec<RankedProvider>>,
    /// Human-readable outcome, non-empty whenever the request is `Failed`.
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted per-provider call status row, used for live progress and the
/// calling-gate poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCall {
    pub request_id: String,
    pub provider_name: String,
    pub phone: String,
    #[serde(default)]
    pub provider_id: Option<String>,
    /// Voice backend call id, once the call has been placed.
    #[serde(default)]
    pub call_id: Option<String>,
    pub status: CallStatus,
    pub dispatched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Classification of an interaction-log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogStatus {
    Success,
    Warning,
    Error,
    Info,
}

/// Append-only audit record for one lifecycle step. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub request_id: String,
    /// Step name (e.g. "calling", "ranking", "booking").
    pub step: String,
    pub detail: String,
    pub status: LogStatus,
    #[serde(default)]
    pub call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InteractionLogEntry {
    /// Creates a log entry stamped with the current time.
    pub fn new(
        request_id: impl Into<String>,
        step: impl Into<String>,
        detail: impl Into<String>,
        status: LogStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            step: step.into(),
            detail: detail.into(),
            status,
            call_id: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches a call id to the entry.
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }
}
