// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use ringlet_core::types::{
    BatchOptions, CallRequest, CallStatus, LifecycleState, ServiceRequest, Urgency,
};
use ringlet_core::{CallResult, DispatchMethod, FetchStatus, RingletError};
use ringlet_lifecycle::ProviderSelection;
use ringlet_voice::map_status;
use tracing::{debug, warn};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps workspace errors onto HTTP statuses.
fn error_response(err: &RingletError) -> Response {
    let status = match err {
        RingletError::NotFound(_) => StatusCode::NOT_FOUND,
        RingletError::Conflict(_) | RingletError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        RingletError::Config(_) | RingletError::Dispatch(_) => StatusCode::BAD_REQUEST,
        RingletError::FlowRequired(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// --- Public health ---

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health (unauthenticated liveness).
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// --- Webhook intake ---

/// Analysis block within a completion event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub structured_data: Option<serde_json::Value>,
    #[serde(default)]
    pub success_evaluation: Option<String>,
}

/// Correlation metadata attached to a completion event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Completion notification payload from the voice backend.
#[derive(Debug, Clone, Deserialize)]
pub struct CallEventPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub analysis: Option<EventAnalysis>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

/// Acknowledgment body for POST /v1/events/calls.
#[derive(Debug, Serialize)]
pub struct EventAck {
    pub received: bool,
}

/// POST /v1/events/calls
///
/// Always acknowledges immediately: the upstream sender must never be made
/// to retry because of downstream processing. Recognized completion events
/// are processed on a detached task; everything else is acknowledged
/// without action.
pub async fn post_call_event(
    State(state): State<GatewayState>,
    Json(event): Json<CallEventPayload>,
) -> (StatusCode, Json<EventAck>) {
    let relevant = matches!(event.event_type.as_str(), "call.completed" | "call.ended");
    match (&event.call_id, relevant) {
        (Some(call_id), true) => {
            let call_id = call_id.clone();
            let tracker = state.tracker.clone();
            tracker.spawn(async move {
                process_call_event(state, call_id, event).await;
            });
        }
        _ => {
            debug!(event_type = event.event_type, "ignoring irrelevant call event");
        }
    }
    (StatusCode::OK, Json(EventAck { received: true }))
}

/// Detached webhook processing: seed the cache with the partial snapshot,
/// advance the persisted per-provider status, then run enrichment.
async fn process_call_event(state: GatewayState, call_id: String, event: CallEventPayload) {
    let metadata = event.metadata.clone().unwrap_or_default();
    let status = map_status(
        event.status.as_deref().unwrap_or("ended"),
        event.ended_reason.as_deref(),
    );

    let mut partial = CallResult::partial(
        call_id.clone(),
        metadata.provider_name.unwrap_or_default(),
        metadata.phone.unwrap_or_default(),
        status,
        DispatchMethod::Direct,
    );
    partial.request_id = metadata.request_id;
    partial.duration_secs = event.duration_seconds;
    partial.ended_reason = event.ended_reason;
    partial.transcript = event.transcript;
    partial.analysis = event.analysis.map(|a| ringlet_core::CallAnalysis {
        summary: a.summary,
        structured: a.structured_data,
        success_evaluation: a.success_evaluation,
    });
    partial.cost = event.cost;
    partial.completeness = FetchStatus::Partial;

    state.cache.set(partial).await;

    // Keep the live-progress rows current even before enrichment lands.
    if status.is_terminal()
        && let Err(e) = state.storage.update_provider_call_status(&call_id, status).await
    {
        warn!(call_id, error = %e, "failed to advance provider status from webhook");
    }

    state.fetcher.enrich(&call_id).await;
}

// --- Result lookup and cache administration ---

/// GET /v1/calls/{call_id}
pub async fn get_call(
    State(state): State<GatewayState>,
    Path(call_id): Path<String>,
) -> Response {
    match state.cache.get(&call_id).await {
        Some(result) => Json(result).into_response(),
        None => error_response(&RingletError::NotFound(format!("call {call_id}"))),
    }
}

/// GET /v1/calls (cache diagnostics).
pub async fn get_cache_stats(State(state): State<GatewayState>) -> Response {
    Json(state.cache.stats().await).into_response()
}

/// DELETE /v1/calls/{call_id}
pub async fn delete_call(
    State(state): State<GatewayState>,
    Path(call_id): Path<String>,
) -> Response {
    if state.cache.remove(&call_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(&RingletError::NotFound(format!("call {call_id}")))
    }
}

// --- Batch dispatch ---

/// Request body for POST /v1/dispatch and /v1/dispatch/async.
#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    pub requests: Vec<CallRequest>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
}

impl DispatchBody {
    fn options(&self) -> BatchOptions {
        BatchOptions {
            max_concurrent: self.max_concurrent.unwrap_or(BatchOptions::DEFAULT_CONCURRENT),
            urgency: self.urgency.unwrap_or_default(),
        }
    }
}

/// Response body for POST /v1/dispatch/async.
#[derive(Debug, Serialize)]
pub struct DispatchAcceptedResponse {
    pub execution_id: String,
    pub items: usize,
    /// Status polling location when the batch is linked to a service request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_location: Option<String>,
}

/// POST /v1/dispatch — synchronous batch dispatch, returns the full result.
pub async fn post_dispatch(
    State(state): State<GatewayState>,
    Json(body): Json<DispatchBody>,
) -> Response {
    if body.requests.is_empty() {
        return error_response(&RingletError::Dispatch("requests must not be empty".into()));
    }
    match state.dispatcher.dispatch_batch(&body.requests, &body.options()).await {
        Ok(batch) => Json(batch).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /v1/dispatch/async — accepted acknowledgment plus execution id.
pub async fn post_dispatch_async(
    State(state): State<GatewayState>,
    Json(body): Json<DispatchBody>,
) -> Response {
    if body.requests.is_empty() {
        return error_response(&RingletError::Dispatch("requests must not be empty".into()));
    }
    let options = body.options();
    let status_location = body.requests.first().and_then(|r| {
        r.request_id
            .as_ref()
            .map(|id| format!("/v1/requests/{id}/status"))
    });
    match state.dispatcher.dispatch_batch_async(body.requests, options).await {
        Ok(ticket) => (
            StatusCode::ACCEPTED,
            Json(DispatchAcceptedResponse {
                execution_id: ticket.execution_id,
                items: ticket.items,
                status_location,
            }),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// --- Service requests ---

/// One candidate provider in a create-request payload.
#[derive(Debug, Deserialize)]
pub struct ProviderCandidate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub provider_id: Option<String>,
}

/// Request body for POST /v1/requests.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub service_type: String,
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub address: String,
    pub providers: Vec<ProviderCandidate>,
}

/// Response body for POST /v1/requests.
#[derive(Debug, Serialize)]
pub struct CreateRequestResponse {
    pub id: String,
    pub state: LifecycleState,
    pub status_location: String,
}

/// POST /v1/requests — create a service request and start its lifecycle run.
pub async fn post_request(
    State(state): State<GatewayState>,
    Json(body): Json<CreateRequestBody>,
) -> Response {
    if body.providers.is_empty() {
        return error_response(&RingletError::Dispatch(
            "providers must not be empty".into(),
        ));
    }

    let now = chrono::Utc::now();
    let request = ServiceRequest {
        id: uuid::Uuid::new_v4().to_string(),
        service_type: body.service_type.clone(),
        description: body.description.clone(),
        urgency: body.urgency,
        address: body.address.clone(),
        state: LifecycleState::Pending,
        selected_provider: None,
        recommendations: None,
        outcome: None,
        appointment_date: None,
        appointment_time: None,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = state.storage.create_service_request(&request).await {
        return error_response(&e);
    }

    let candidates: Vec<CallRequest> = body
        .providers
        .iter()
        .map(|p| CallRequest {
            provider_name: p.name.clone(),
            phone: p.phone.clone(),
            provider_id: p.provider_id.clone(),
            service_type: body.service_type.clone(),
            problem: body.description.clone(),
            urgency: body.urgency,
            address: body.address.clone(),
            prompt_override: None,
            request_id: Some(request.id.clone()),
        })
        .collect();

    if let Err(e) = state.runner.start(request.clone(), candidates) {
        return error_response(&e);
    }

    (
        StatusCode::ACCEPTED,
        Json(CreateRequestResponse {
            status_location: format!("/v1/requests/{}/status", request.id),
            id: request.id,
            state: LifecycleState::Pending,
        }),
    )
        .into_response()
}

/// Aggregate call counts in a status response.
#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub in_progress: usize,
    pub terminal: usize,
}

/// Per-provider entry in a status response.
#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub provider_name: String,
    pub phone: String,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

/// Response body for GET /v1/requests/{id}/status.
#[derive(Debug, Serialize)]
pub struct RequestStatusResponse {
    pub request_id: String,
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    pub counts: StatusCounts,
    pub providers: Vec<ProviderStatus>,
}

/// GET /v1/requests/{id}/status — aggregate progress for polling clients.
pub async fn get_request_status(
    State(state): State<GatewayState>,
    Path(request_id): Path<String>,
) -> Response {
    let request = match state.storage.get_service_request(&request_id).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            return error_response(&RingletError::NotFound(format!(
                "service request {request_id}"
            )));
        }
        Err(e) => return error_response(&e),
    };

    let rows = match state.storage.list_provider_calls(&request_id).await {
        Ok(rows) => rows,
        Err(e) => return error_response(&e),
    };

    let counts = StatusCounts {
        queued: rows.iter().filter(|r| r.status == CallStatus::Queued).count(),
        in_progress: rows.iter().filter(|r| r.status == CallStatus::InProgress).count(),
        terminal: rows.iter().filter(|r| r.status.is_terminal()).count(),
    };
    let providers = rows
        .into_iter()
        .map(|r| ProviderStatus {
            provider_name: r.provider_name,
            phone: r.phone,
            status: r.status,
            call_id: r.call_id,
        })
        .collect();

    Json(RequestStatusResponse {
        request_id,
        state: request.state,
        outcome: request.outcome,
        counts,
        providers,
    })
    .into_response()
}

/// Response body for GET /v1/requests/{id}/log.
#[derive(Debug, Serialize)]
pub struct RequestLogResponse {
    pub entries: Vec<ringlet_core::InteractionLogEntry>,
}

/// GET /v1/requests/{id}/log — the append-only audit trail.
pub async fn get_request_log(
    State(state): State<GatewayState>,
    Path(request_id): Path<String>,
) -> Response {
    match state.storage.list_log(&request_id).await {
        Ok(entries) => Json(RequestLogResponse { entries }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Request body for POST /v1/requests/{id}/select.
#[derive(Debug, Deserialize)]
pub struct SelectBody {
    #[serde(default)]
    pub provider_name: Option<String>,
    /// 1-based rank within the recommendation set.
    #[serde(default)]
    pub rank: Option<usize>,
}

/// POST /v1/requests/{id}/select — advance RECOMMENDED -> BOOKING.
pub async fn post_select(
    State(state): State<GatewayState>,
    Path(request_id): Path<String>,
    Json(body): Json<SelectBody>,
) -> Response {
    let selection = match (body.provider_name, body.rank) {
        (Some(name), _) => ProviderSelection::ByName(name),
        (None, Some(rank)) => ProviderSelection::ByRank(rank),
        (None, None) => {
            return error_response(&RingletError::Dispatch(
                "selection requires provider_name or rank".into(),
            ));
        }
    };

    match state.runner.select_provider(&request_id, selection).await {
        Ok(request) => Json(request).into_response(),
        Err(e) => error_response(&e),
    }
}
