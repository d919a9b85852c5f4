// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow engine integration: orchestrated batch execution and tier-1 ranking.
//!
//! The flow engine is an optional external workflow backend capable of
//! running the whole call batch and the ranking flow itself. When it is
//! configured and healthy the dispatcher prefers it; the voice backend
//! remains the fallback.

pub mod client;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallRequest, CallResult, DispatchMethod, HealthStatus,
    RankedProvider, ServiceRequest,
};
use ringlet_core::{BackendAdapter, ExecutionBackend, RankingOracle, RingletError};
use tracing::debug;

pub use client::FlowClient;

/// Execution backend that delegates whole batches to the flow engine.
pub struct FlowBackend {
    client: Arc<FlowClient>,
}

impl FlowBackend {
    pub fn new(client: Arc<FlowClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendAdapter for FlowBackend {
    fn name(&self) -> &str {
        "flow"
    }

    async fn health_check(&self) -> Result<HealthStatus, RingletError> {
        self.client.health().await
    }
}

#[async_trait]
impl ExecutionBackend for FlowBackend {
    fn method(&self) -> DispatchMethod {
        DispatchMethod::Flow
    }

    async fn execute_call(&self, request: &CallRequest) -> Result<CallResult, RingletError> {
        let batch = self
            .client
            .run_batch(std::slice::from_ref(request), &BatchOptions::default())
            .await?;
        if let Some(error) = batch.errors.first() {
            return Err(RingletError::flow(error.message.clone()));
        }
        batch
            .results
            .into_iter()
            .next()
            .ok_or_else(|| RingletError::flow("engine returned no result for single call"))
    }

    async fn run_batch(
        &self,
        requests: &[CallRequest],
        options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        self.client.run_batch(requests, options).await
    }
}

/// Tier-1 ranking oracle backed by the flow engine's ranking flow.
///
/// Probes health before submitting: an unhealthy engine fails fast so the
/// caller can drop to the tier-2 oracle without waiting on a dead backend.
pub struct FlowRanker {
    client: Arc<FlowClient>,
}

impl FlowRanker {
    pub fn new(client: Arc<FlowClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RankingOracle for FlowRanker {
    fn name(&self) -> &str {
        "flow"
    }

    async fn rank(
        &self,
        request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError> {
        match self.client.health().await? {
            HealthStatus::Healthy | HealthStatus::Degraded(_) => {}
            HealthStatus::Unhealthy(reason) => {
                debug!(request_id = request.id, reason, "flow ranker skipped: engine unhealthy");
                return Err(RingletError::flow(format!("engine unhealthy: {reason}")));
            }
        }
        self.client.rank(request, results).await
    }
}
