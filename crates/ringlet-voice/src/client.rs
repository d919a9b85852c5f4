// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the voice backend API.
//!
//! Provides [`VoiceClient`] which handles request construction,
//! authentication, and transient error retry.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use ringlet_config::model::VoiceConfig;
use ringlet_core::RingletError;
use ringlet_core::types::{CallRequest, HealthStatus};
use tracing::{debug, warn};

use crate::types::{ApiErrorBody, PlaceCallBody, WireCall};

/// Timeout for the dedicated health probe; deliberately shorter than the
/// general request timeout because probes sit on the dispatch path.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP client for voice backend communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct VoiceClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl VoiceClient {
    /// Creates a new voice backend client from configuration.
    pub fn new(config: &VoiceConfig) -> Result<Self, RingletError> {
        let mut headers = HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                RingletError::Config(format!("invalid voice API key header value: {e}"))
            })?;
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RingletError::Voice {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Places an outbound call. Returns the backend's initial call record.
    pub async fn place_call(&self, request: &CallRequest) -> Result<WireCall, RingletError> {
        let url = format!("{}/v1/calls", self.base_url);
        let body = PlaceCallBody::from_request(request);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, phone = request.phone, "retrying call placement after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| RingletError::Voice {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, phone = request.phone, "call placement response");

            if status.is_success() {
                return response.json::<WireCall>().await.map_err(|e| RingletError::Voice {
                    message: format!("invalid call record in response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(RingletError::voice(format!("API returned {status}: {body}")));
                continue;
            }

            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        Err(last_error
            .unwrap_or_else(|| RingletError::voice("call placement failed with no response")))
    }

    /// Fetches the authoritative record for a call id.
    pub async fn get_call(&self, call_id: &str) -> Result<WireCall, RingletError> {
        let url = format!("{}/v1/calls/{call_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RingletError::Voice {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RingletError::NotFound(format!("call {call_id}")));
        }
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        response.json::<WireCall>().await.map_err(|e| RingletError::Voice {
            message: format!("invalid call record in response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Probes the backend's health endpoint with a short timeout.
    pub async fn health(&self) -> Result<HealthStatus, RingletError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "health endpoint returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("health probe failed: {e}"))),
        }
    }
}

/// Builds the error for a non-success, non-transient API response.
fn api_error(status: StatusCode, body: String) -> RingletError {
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .unwrap_or(body);
    RingletError::voice(format!("API returned {status}: {message}"))
}

/// Retryable statuses: rate limiting and transient server failures.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
    )
}
