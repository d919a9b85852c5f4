// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice backend integration: HTTP client plus the direct execution path.
//!
//! [`VoiceBackend`] implements [`ExecutionBackend`] by placing each call via
//! the voice API and polling its authoritative record until a terminal
//! status, under a semaphore-bounded worker pool. It also implements
//! [`CallRecordSource`] for the enrichment fetcher.

pub mod client;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use ringlet_config::model::VoiceConfig;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallRequest, CallResult, CallStatus, DispatchError,
    DispatchMethod, HealthStatus,
};
use ringlet_core::{BackendAdapter, CallRecordSource, ExecutionBackend, RingletError};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

pub use client::VoiceClient;
pub use types::{WireCall, map_status};

/// Direct execution backend: one API call per outbound phone call, polled to
/// terminal status.
pub struct VoiceBackend {
    client: VoiceClient,
    poll_interval: Duration,
    poll_max_attempts: usize,
}

impl VoiceBackend {
    pub fn new(config: &VoiceConfig) -> Result<Self, RingletError> {
        Ok(Self {
            client: VoiceClient::new(config)?,
            poll_interval: Duration::from_millis(config.call_poll_interval_ms),
            poll_max_attempts: config.call_poll_max_attempts,
        })
    }

    /// Returns the underlying client, shared with the enrichment path.
    pub fn client(&self) -> &VoiceClient {
        &self.client
    }

    /// Polls the record for `call_id` until its status is terminal.
    ///
    /// On window exhaustion the last observed record is returned with a
    /// `Timeout` status; the call itself is never cancelled mid-flight.
    async fn poll_to_terminal(
        &self,
        mut wire: types::WireCall,
        request: &CallRequest,
    ) -> CallResult {
        for attempt in 1..=self.poll_max_attempts {
            let status = types::map_status(&wire.status, wire.ended_reason.as_deref());
            if status.is_terminal() {
                debug!(call_id = wire.id, %status, attempt, "call reached terminal status");
                return wire.into_result(Some(request), DispatchMethod::Direct);
            }
            tokio::time::sleep(self.poll_interval).await;
            match self.client.get_call(&wire.id).await {
                Ok(latest) => wire = latest,
                Err(e) => {
                    warn!(call_id = wire.id, attempt, error = %e, "record poll failed");
                }
            }
        }

        warn!(
            call_id = wire.id,
            attempts = self.poll_max_attempts,
            "poll window exhausted; marking call timed out"
        );
        let mut result = wire.into_result(Some(request), DispatchMethod::Direct);
        result.status = CallStatus::Timeout;
        result
    }
}

#[async_trait]
impl BackendAdapter for VoiceBackend {
    fn name(&self) -> &str {
        "voice"
    }

    async fn health_check(&self) -> Result<HealthStatus, RingletError> {
        self.client.health().await
    }
}

#[async_trait]
impl ExecutionBackend for VoiceBackend {
    fn method(&self) -> DispatchMethod {
        DispatchMethod::Direct
    }

    async fn execute_call(&self, request: &CallRequest) -> Result<CallResult, RingletError> {
        let wire = self.client.place_call(request).await?;
        debug!(call_id = wire.id, phone = request.phone, "call placed");
        Ok(self.poll_to_terminal(wire, request).await)
    }

    async fn run_batch(
        &self,
        requests: &[CallRequest],
        options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        let semaphore = Arc::new(Semaphore::new(options.clamped_concurrency()));

        let outcomes = join_all(requests.iter().map(|request| {
            let semaphore = semaphore.clone();
            async move {
                // Closed only on semaphore.close(), which we never call.
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| RingletError::Internal(e.to_string()))?;
                self.execute_call(request).await
            }
        }))
        .await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for (request, outcome) in requests.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(phone = request.phone, error = %e, "per-item dispatch failure");
                    errors.push(DispatchError {
                        provider_name: request.provider_name.clone(),
                        phone: request.phone.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(BatchResult::from_parts(results, errors))
    }
}

#[async_trait]
impl CallRecordSource for VoiceBackend {
    async fn fetch_call(&self, call_id: &str) -> Result<CallResult, RingletError> {
        let wire = self.client.get_call(call_id).await?;
        Ok(wire.into_result(None, DispatchMethod::Direct))
    }
}
