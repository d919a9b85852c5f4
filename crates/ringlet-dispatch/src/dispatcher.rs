// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The call dispatcher: bounded-concurrency batch submission over the
//! selected execution backend.
//!
//! Two entry points: [`dispatch_batch`](CallDispatcher::dispatch_batch)
//! blocks until every item reaches a terminal status;
//! [`dispatch_batch_async`](CallDispatcher::dispatch_batch_async) marks every
//! item `queued` in durable storage, returns an accepted ticket, and runs
//! the same dispatch logic on the shared task tracker so callers can poll
//! live progress instead of blocking.

use std::sync::Arc;

use chrono::Utc;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallRequest, CallResult, CallStatus, ProviderCall,
};
use ringlet_core::{RingletError, Storage};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::strategy::BackendStrategy;

/// Acknowledgment for an asynchronous batch dispatch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchTicket {
    /// Generated execution identifier for log correlation.
    pub execution_id: String,
    /// Number of items accepted into the batch.
    pub items: usize,
}

/// Bounded-concurrency batch submitter over the selected execution backend.
pub struct CallDispatcher {
    strategy: BackendStrategy,
    storage: Arc<dyn Storage>,
    tracker: TaskTracker,
    test_mode: bool,
    test_numbers: Vec<String>,
}

impl CallDispatcher {
    pub fn new(
        strategy: BackendStrategy,
        storage: Arc<dyn Storage>,
        tracker: TaskTracker,
        test_mode: bool,
        test_numbers: Vec<String>,
    ) -> Self {
        Self {
            strategy,
            storage,
            tracker,
            test_mode,
            test_numbers,
        }
    }

    /// Dispatches a single call to a terminal status.
    pub async fn dispatch_one(&self, request: &CallRequest) -> Result<CallResult, RingletError> {
        let request = self.apply_test_overrides(std::slice::from_ref(request)).remove(0);
        let backend = self.strategy.select().await?;
        let result = backend.execute_call(&request).await?;
        self.persist_result(&result).await;
        Ok(result)
    }

    /// Dispatches a batch and blocks until every item is terminal.
    ///
    /// Per-item failures land in the batch's error list; only a batch-level
    /// failure (strict-mode flow outage, backend rejection of the whole
    /// batch) returns `Err`.
    pub async fn dispatch_batch(
        &self,
        requests: &[CallRequest],
        options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        let requests = self.apply_test_overrides(requests);
        let backend = self.strategy.select().await?;
        info!(
            backend = backend.name(),
            items = requests.len(),
            max_concurrent = options.clamped_concurrency(),
            "dispatching call batch"
        );
        let batch = backend.run_batch(&requests, options).await?;
        self.persist_batch(&requests, &batch).await;
        info!(
            completed = batch.completed,
            failed = batch.failed,
            no_answer = batch.no_answer,
            errors = batch.errors.len(),
            "batch dispatch finished"
        );
        Ok(batch)
    }

    /// Accepts a batch for background dispatch.
    ///
    /// Every item is marked `queued` in durable storage before the ticket is
    /// returned, so status polling observes the batch immediately. The
    /// dispatch itself runs detached on the task tracker; the caller never
    /// blocks on call completion.
    pub async fn dispatch_batch_async(
        self: &Arc<Self>,
        requests: Vec<CallRequest>,
        options: BatchOptions,
    ) -> Result<DispatchTicket, RingletError> {
        let execution_id = uuid::Uuid::new_v4().to_string();
        let requests = self.apply_test_overrides(&requests);

        let now = Utc::now();
        for request in &requests {
            if let Some(ref request_id) = request.request_id {
                self.storage
                    .upsert_provider_call(&ProviderCall {
                        request_id: request_id.clone(),
                        provider_name: request.provider_name.clone(),
                        phone: request.phone.clone(),
                        provider_id: request.provider_id.clone(),
                        call_id: None,
                        status: CallStatus::Queued,
                        dispatched_at: now,
                        updated_at: now,
                    })
                    .await?;
            }
        }

        let ticket = DispatchTicket {
            execution_id: execution_id.clone(),
            items: requests.len(),
        };

        let dispatcher = self.clone();
        self.tracker.spawn(async move {
            match dispatcher.strategy.select().await {
                Ok(backend) => {
                    info!(
                        execution_id,
                        backend = backend.name(),
                        items = requests.len(),
                        "background batch dispatch started"
                    );
                    match backend.run_batch(&requests, &options).await {
                        Ok(batch) => {
                            dispatcher.persist_batch(&requests, &batch).await;
                            info!(
                                execution_id,
                                completed = batch.completed,
                                errors = batch.errors.len(),
                                "background batch dispatch finished"
                            );
                        }
                        Err(e) => {
                            error!(execution_id, error = %e, "background batch dispatch failed");
                            dispatcher.mark_batch_errored(&requests).await;
                        }
                    }
                }
                Err(e) => {
                    error!(execution_id, error = %e, "backend selection failed for background batch");
                    dispatcher.mark_batch_errored(&requests).await;
                }
            }
        });

        Ok(ticket)
    }

    /// Substitutes the safe test-number pool (round-robin) when test mode is
    /// on. Every substitution is logged.
    fn apply_test_overrides(&self, requests: &[CallRequest]) -> Vec<CallRequest> {
        if !self.test_mode || self.test_numbers.is_empty() {
            return requests.to_vec();
        }
        requests
            .iter()
            .enumerate()
            .map(|(i, request)| {
                let substitute = &self.test_numbers[i % self.test_numbers.len()];
                warn!(
                    provider = request.provider_name,
                    original = request.phone,
                    substitute,
                    "test mode: overriding outbound phone number"
                );
                let mut request = request.clone();
                request.phone = substitute.clone();
                request
            })
            .collect()
    }

    /// Persists terminal statuses and call results after a batch completes.
    /// All writes are best-effort: the batch result is already in hand.
    async fn persist_batch(&self, requests: &[CallRequest], batch: &BatchResult) {
        for result in &batch.results {
            self.persist_result(result).await;
            if let Some(request) = requests.iter().find(|r| r.phone == result.phone)
                && let Some(ref request_id) = request.request_id
            {
                let now = Utc::now();
                if let Err(e) = self
                    .storage
                    .upsert_provider_call(&ProviderCall {
                        request_id: request_id.clone(),
                        provider_name: result.provider_name.clone(),
                        phone: result.phone.clone(),
                        provider_id: request.provider_id.clone(),
                        call_id: Some(result.call_id.clone()),
                        status: result.status,
                        dispatched_at: now,
                        updated_at: now,
                    })
                    .await
                {
                    warn!(call_id = result.call_id, error = %e, "failed to persist provider status");
                }
            }
        }
        // Items that never dispatched get an error status row.
        for dispatch_error in &batch.errors {
            if let Some(request) = requests.iter().find(|r| r.phone == dispatch_error.phone)
                && let Some(ref request_id) = request.request_id
            {
                let now = Utc::now();
                if let Err(e) = self
                    .storage
                    .upsert_provider_call(&ProviderCall {
                        request_id: request_id.clone(),
                        provider_name: dispatch_error.provider_name.clone(),
                        phone: dispatch_error.phone.clone(),
                        provider_id: request.provider_id.clone(),
                        call_id: None,
                        status: CallStatus::Error,
                        dispatched_at: now,
                        updated_at: now,
                    })
                    .await
                {
                    warn!(phone = dispatch_error.phone, error = %e, "failed to persist dispatch error");
                }
            }
        }
    }

    /// Marks every item of a batch that never ran as errored.
    async fn mark_batch_errored(&self, requests: &[CallRequest]) {
        for request in requests {
            if let Some(ref request_id) = request.request_id {
                let now = Utc::now();
                if let Err(e) = self
                    .storage
                    .upsert_provider_call(&ProviderCall {
                        request_id: request_id.clone(),
                        provider_name: request.provider_name.clone(),
                        phone: request.phone.clone(),
                        provider_id: request.provider_id.clone(),
                        call_id: None,
                        status: CallStatus::Error,
                        dispatched_at: now,
                        updated_at: now,
                    })
                    .await
                {
                    warn!(phone = request.phone, error = %e, "failed to mark item errored");
                }
            }
        }
    }

    /// Best-effort durable persistence of one call result.
    async fn persist_result(&self, result: &CallResult) {
        if let Err(e) = self.storage.save_call_result(result).await {
            warn!(call_id = result.call_id, error = %e, "failed to persist call result");
        }
    }
}
