// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the voice backend API.

use serde::{Deserialize, Serialize};

use ringlet_core::types::{CallAnalysis, CallRequest, CallResult, CallStatus, DispatchMethod};

/// Request body for `POST /v1/calls`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceCallBody {
    /// Destination phone number in E.164 form.
    pub to: String,
    /// Display name announced by the agent.
    pub display_name: String,
    /// Scripted prompt override; the backend's default script applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub metadata: CallMetadata,
}

/// Free-form metadata attached to a call for webhook correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub service_type: String,
    pub problem: String,
    pub urgency: String,
    pub address: String,
}

impl PlaceCallBody {
    pub fn from_request(request: &CallRequest) -> Self {
        Self {
            to: request.phone.clone(),
            display_name: request.provider_name.clone(),
            script: request.prompt_override.clone(),
            metadata: CallMetadata {
                request_id: request.request_id.clone(),
                service_type: request.service_type.clone(),
                problem: request.problem.clone(),
                urgency: request.urgency.to_string(),
                address: request.address.clone(),
            },
        }
    }
}

/// A call record as the voice backend serves it.
#[derive(Debug, Clone, Deserialize)]
pub struct WireCall {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub analysis: Option<WireAnalysis>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// Analysis block within a call record.
#[derive(Debug, Clone, Deserialize)]
pub struct WireAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub structured_data: Option<serde_json::Value>,
    #[serde(default)]
    pub success_evaluation: Option<String>,
}

/// Error body the backend returns for 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Maps a wire status string (plus the ended-reason hint) to a typed status.
///
/// Backends report terminal calls as plain "ended"; the ended reason then
/// distinguishes no-answer, voicemail, and busy outcomes.
pub fn map_status(status: &str, ended_reason: Option<&str>) -> CallStatus {
    let reason = ended_reason.unwrap_or_default().to_ascii_lowercase();
    match status.to_ascii_lowercase().as_str() {
        "queued" | "scheduled" => CallStatus::Queued,
        "ringing" | "in-progress" | "in_progress" | "forwarding" => CallStatus::InProgress,
        "ended" | "completed" => {
            if reason.contains("no-answer") || reason.contains("did-not-answer") {
                CallStatus::NoAnswer
            } else if reason.contains("voicemail") {
                CallStatus::Voicemail
            } else if reason.contains("busy") {
                CallStatus::Busy
            } else if reason.contains("error") || reason.contains("failed") {
                CallStatus::Error
            } else {
                CallStatus::Completed
            }
        }
        "failed" => CallStatus::Failed,
        "timeout" | "timed_out" => CallStatus::Timeout,
        _ => CallStatus::Error,
    }
}

impl WireCall {
    /// Converts the wire record to the domain type.
    ///
    /// Provider identity prefers the wire record's own fields and falls back
    /// to the originating request when the backend omits them.
    pub fn into_result(self, origin: Option<&CallRequest>, method: DispatchMethod) -> CallResult {
        let status = map_status(&self.status, self.ended_reason.as_deref());
        let mut result = CallResult::partial(
            self.id,
            self.display_name
                .or_else(|| origin.map(|r| r.provider_name.clone()))
                .unwrap_or_default(),
            self.to
                .or_else(|| origin.map(|r| r.phone.clone()))
                .unwrap_or_default(),
            status,
            method,
        );
        result.request_id = origin.and_then(|r| r.request_id.clone());
        result.duration_secs = self.duration_seconds;
        result.ended_reason = self.ended_reason;
        result.transcript = self.transcript;
        result.analysis = self.analysis.map(|a| CallAnalysis {
            summary: a.summary,
            structured: a.structured_data,
            success_evaluation: a.success_evaluation,
        });
        result.cost = self.cost;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_uses_ended_reason_hints() {
        assert_eq!(map_status("ended", None), CallStatus::Completed);
        assert_eq!(
            map_status("ended", Some("customer-did-not-answer")),
            CallStatus::NoAnswer
        );
        assert_eq!(map_status("ended", Some("voicemail-detected")), CallStatus::Voicemail);
        assert_eq!(map_status("ended", Some("customer-busy")), CallStatus::Busy);
        assert_eq!(map_status("ended", Some("pipeline-error")), CallStatus::Error);
        assert_eq!(map_status("in-progress", None), CallStatus::InProgress);
        assert_eq!(map_status("queued", None), CallStatus::Queued);
        assert_eq!(map_status("something-new", None), CallStatus::Error);
    }
}
