// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the flow engine API.

use serde::{Deserialize, Serialize};

use ringlet_core::types::{
    BatchResult, CallAnalysis, CallRequest, CallResult, CallStatus, DispatchError,
    DispatchMethod, RankedProvider,
};

/// Request body for `POST /v1/flows/call-batch`.
///
/// The engine performs its own per-item concurrency control; the bound is a
/// hint it must respect.
#[derive(Debug, Clone, Serialize)]
pub struct FlowBatchBody {
    pub requests: Vec<CallRequest>,
    pub max_concurrent: usize,
    pub urgency: String,
}

/// One item in the flow engine's batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowBatchItem {
    pub call_id: String,
    pub provider_name: String,
    pub phone: String,
    pub status: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub success_evaluation: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Response body for `POST /v1/flows/call-batch`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowBatchResponse {
    #[serde(default)]
    pub results: Vec<FlowBatchItem>,
    #[serde(default)]
    pub errors: Vec<DispatchError>,
}

/// Request body for `POST /v1/flows/rank`.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRankBody {
    pub request_id: String,
    pub service_type: String,
    pub description: String,
    pub urgency: String,
    pub results: Vec<CallResult>,
}

/// Response body for `POST /v1/flows/rank`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowRankResponse {
    #[serde(default)]
    pub recommendations: Vec<RankedProvider>,
}

impl FlowBatchItem {
    /// Converts an engine result item to the domain type.
    pub fn into_result(self) -> CallResult {
        let status = self
            .status
            .parse::<CallStatus>()
            .unwrap_or(CallStatus::Error);
        let mut result = CallResult::partial(
            self.call_id,
            self.provider_name,
            self.phone,
            status,
            DispatchMethod::Flow,
        );
        result.duration_secs = self.duration_seconds;
        result.ended_reason = self.ended_reason;
        result.transcript = self.transcript;
        if self.summary.is_some() || self.success_evaluation.is_some() {
            result.analysis = Some(CallAnalysis {
                summary: self.summary,
                structured: None,
                success_evaluation: self.success_evaluation,
            });
        }
        result.cost = self.cost;
        result
    }
}

impl FlowBatchResponse {
    /// Converts the engine response into an aggregated batch result.
    pub fn into_batch_result(self) -> BatchResult {
        let results = self.results.into_iter().map(FlowBatchItem::into_result).collect();
        BatchResult::from_parts(results, self.errors)
    }
}
