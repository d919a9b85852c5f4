// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution backend trait for outbound call placement.
//!
//! Two implementations exist: the flow engine (delegates a whole batch to the
//! external orchestration backend, which performs its own per-item concurrency
//! control) and the direct backend (places each call against the voice API
//! under the dispatcher's own concurrency-limited worker pool). The dispatch
//! strategy selects between them per batch based on a health probe.

use async_trait::async_trait;

use crate::error::RingletError;
use crate::traits::adapter::BackendAdapter;
use crate::types::{BatchOptions, BatchResult, CallRequest, CallResult, DispatchMethod};

/// A backend capable of executing outbound call batches to terminal status.
#[async_trait]
pub trait ExecutionBackend: BackendAdapter {
    /// The dispatch method this backend represents.
    fn method(&self) -> DispatchMethod;

    /// Executes one call to a terminal status.
    async fn execute_call(&self, request: &CallRequest) -> Result<CallResult, RingletError>;

    /// Executes a batch of calls, returning once every item has reached a
    /// terminal status or been recorded as a dispatch error.
    ///
    /// A per-item failure must land in the batch's error list without
    /// aborting sibling dispatches; implementations only return `Err` when
    /// the batch as a whole could not be run.
    async fn run_batch(
        &self,
        requests: &[CallRequest],
        options: &BatchOptions,
    ) -> Result<BatchResult, RingletError>;
}

/// Source of authoritative call records, queried by the enrichment fetcher.
///
/// Separate from [`ExecutionBackend`] because record lookup stays on the
/// voice backend even when the flow engine executed the batch.
#[async_trait]
pub trait CallRecordSource: Send + Sync + 'static {
    /// Fetches the authoritative record for a call id.
    ///
    /// Returns whatever the backend currently has; callers decide whether
    /// the record satisfies their completeness predicate.
    async fn fetch_call(&self, call_id: &str) -> Result<CallResult, RingletError>;
}
