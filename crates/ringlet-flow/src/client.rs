// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the flow engine API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use ringlet_config::model::FlowConfig;
use ringlet_core::RingletError;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallRequest, CallResult, HealthStatus, RankedProvider,
    ServiceRequest,
};
use tracing::debug;

use crate::types::{FlowBatchBody, FlowBatchResponse, FlowRankBody, FlowRankResponse};

/// HTTP client for the flow engine.
///
/// The engine runs whole call batches and the ranking flow itself; this
/// client only submits work and converts responses.
#[derive(Debug, Clone)]
pub struct FlowClient {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
    batch_timeout: Duration,
}

impl FlowClient {
    /// Creates a new flow engine client from configuration.
    ///
    /// Returns `None` when no base URL is configured: the flow path is
    /// disabled entirely in that case.
    pub fn from_config(config: &FlowConfig) -> Result<Option<Self>, RingletError> {
        if config.base_url.trim().is_empty() {
            return Ok(None);
        }

        let mut headers = HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                RingletError::Config(format!("invalid flow API key header value: {e}"))
            })?;
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RingletError::Flow {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_timeout: Duration::from_millis(config.health_timeout_ms),
            batch_timeout: Duration::from_secs(config.batch_timeout_secs),
        }))
    }

    /// Probes the engine's health endpoint with the short probe timeout.
    pub async fn health(&self) -> Result<HealthStatus, RingletError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).timeout(self.health_timeout).send().await;
        match response {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "health endpoint returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("health probe failed: {e}"))),
        }
    }

    /// Submits a whole batch to the engine and waits for per-item terminal
    /// results.
    pub async fn run_batch(
        &self,
        requests: &[CallRequest],
        options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        let url = format!("{}/v1/flows/call-batch", self.base_url);
        let body = FlowBatchBody {
            requests: requests.to_vec(),
            max_concurrent: options.clamped_concurrency(),
            urgency: options.urgency.to_string(),
        };

        debug!(items = requests.len(), "submitting batch to flow engine");
        let response = self
            .client
            .post(&url)
            .timeout(self.batch_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| RingletError::Flow {
                message: format!("batch submission failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RingletError::flow(format!("batch flow returned {status}: {body}")));
        }

        let parsed: FlowBatchResponse =
            response.json().await.map_err(|e| RingletError::Flow {
                message: format!("invalid batch response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.into_batch_result())
    }

    /// Runs the engine's ranking flow over completed call results.
    pub async fn rank(
        &self,
        request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError> {
        let url = format!("{}/v1/flows/rank", self.base_url);
        let body = FlowRankBody {
            request_id: request.id.clone(),
            service_type: request.service_type.clone(),
            description: request.description.clone(),
            urgency: request.urgency.to_string(),
            results: results.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RingletError::Flow {
                message: format!("ranking flow failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RingletError::flow(format!(
                "ranking flow returned {status}: {body}"
            )));
        }

        let parsed: FlowRankResponse =
            response.json().await.map_err(|e| RingletError::Flow {
                message: format!("invalid ranking response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.recommendations)
    }
}
