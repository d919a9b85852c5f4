// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock execution backend for deterministic testing.
//!
//! `MockCallBackend` implements `ExecutionBackend` with per-phone scripted
//! outcomes, enabling fast, CI-runnable tests without a voice API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallAnalysis, CallRequest, CallResult, CallStatus, DispatchError,
    DispatchMethod, HealthStatus,
};
use ringlet_core::{BackendAdapter, CallRecordSource, ExecutionBackend, RingletError};
use tokio::sync::Mutex;

/// Scripted outcome for one phone number.
#[derive(Debug, Clone)]
pub struct ScriptedOutcome {
    pub status: CallStatus,
    pub transcript: Option<String>,
    pub structured: Option<serde_json::Value>,
    /// Simulated call duration before the outcome lands.
    pub delay_ms: u64,
    /// Fail at dispatch time instead of producing a result.
    pub fail_dispatch: bool,
}

impl Default for ScriptedOutcome {
    fn default() -> Self {
        Self {
            status: CallStatus::Completed,
            transcript: Some(
                "Yes, we can come Tuesday at 2pm to take a look. Sounds good, see you then."
                    .to_string(),
            ),
            structured: None,
            delay_ms: 5,
            fail_dispatch: false,
        }
    }
}

/// A mock execution backend with scripted per-phone outcomes.
///
/// Unscripted phones get the default completed outcome. Every produced
/// result is retained so `CallRecordSource::fetch_call` can serve it back
/// to the enrichment fetcher.
pub struct MockCallBackend {
    outcomes: DashMap<String, ScriptedOutcome>,
    records: DashMap<String, CallResult>,
    health: Mutex<HealthStatus>,
    call_counter: AtomicUsize,
}

impl MockCallBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: DashMap::new(),
            records: DashMap::new(),
            health: Mutex::new(HealthStatus::Healthy),
            call_counter: AtomicUsize::new(0),
        })
    }

    /// Scripts the outcome for one phone number.
    pub fn script(&self, phone: &str, outcome: ScriptedOutcome) {
        self.outcomes.insert(phone.to_string(), outcome);
    }

    /// Scripts a bare terminal status for one phone number.
    pub fn script_status(&self, phone: &str, status: CallStatus) {
        self.script(
            phone,
            ScriptedOutcome {
                status,
                transcript: None,
                ..Default::default()
            },
        );
    }

    pub async fn set_health(&self, health: HealthStatus) {
        *self.health.lock().await = health;
    }

    /// Number of calls actually executed.
    pub fn calls_placed(&self) -> usize {
        self.call_counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendAdapter for MockCallBackend {
    fn name(&self) -> &str {
        "mock-voice"
    }

    async fn health_check(&self) -> Result<HealthStatus, RingletError> {
        Ok(self.health.lock().await.clone())
    }
}

#[async_trait]
impl ExecutionBackend for MockCallBackend {
    fn method(&self) -> DispatchMethod {
        DispatchMethod::Direct
    }

    async fn execute_call(&self, request: &CallRequest) -> Result<CallResult, RingletError> {
        let outcome = self
            .outcomes
            .get(&request.phone)
            .map(|o| o.clone())
            .unwrap_or_default();
        if outcome.fail_dispatch {
            return Err(RingletError::voice(format!(
                "dispatch rejected for {}",
                request.phone
            )));
        }

        tokio::time::sleep(Duration::from_millis(outcome.delay_ms)).await;
        let seq = self.call_counter.fetch_add(1, Ordering::SeqCst);

        let mut result = CallResult::partial(
            format!("mock-call-{seq}"),
            request.provider_name.clone(),
            request.phone.clone(),
            outcome.status,
            DispatchMethod::Direct,
        );
        result.request_id = request.request_id.clone();
        result.duration_secs = Some(42.0);
        result.transcript = outcome.transcript.clone();
        if outcome.status == CallStatus::Completed {
            result.analysis = Some(CallAnalysis {
                summary: Some(format!("call with {} completed", request.provider_name)),
                structured: outcome.structured.clone(),
                success_evaluation: Some("true".to_string()),
            });
        }

        self.records.insert(result.call_id.clone(), result.clone());
        Ok(result)
    }

    async fn run_batch(
        &self,
        requests: &[CallRequest],
        _options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        let mut results = Vec::new();
        let mut errors = Vec::new();
        for request in requests {
            match self.execute_call(request).await {
                Ok(result) => results.push(result),
                Err(e) => errors.push(DispatchError {
                    provider_name: request.provider_name.clone(),
                    phone: request.phone.clone(),
                    message: e.to_string(),
                }),
            }
        }
        Ok(BatchResult::from_parts(results, errors))
    }
}

#[async_trait]
impl CallRecordSource for MockCallBackend {
    async fn fetch_call(&self, call_id: &str) -> Result<CallResult, RingletError> {
        self.records
            .get(call_id)
            .map(|r| r.clone())
            .ok_or_else(|| RingletError::NotFound(format!("call {call_id}")))
    }
}
