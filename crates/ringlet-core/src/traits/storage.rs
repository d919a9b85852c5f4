// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait for the durable persistence backend.

use async_trait::async_trait;

use crate::error::RingletError;
use crate::traits::adapter::BackendAdapter;
use crate::types::{
    CallResult, CallStatus, InteractionLogEntry, LifecycleState, ProviderCall, RankedProvider,
    ServiceRequest,
};

/// Durable persistence operations the orchestration core depends on.
///
/// All writes are best-effort from the caller's point of view: callers decide
/// whether a failure is fatal (state transitions) or logged and swallowed
/// (audit side effects).
#[async_trait]
pub trait Storage: BackendAdapter {
    /// Initializes the storage backend (migrations, connections).
    async fn initialize(&self) -> Result<(), RingletError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), RingletError>;

    // --- Service requests ---

    async fn create_service_request(&self, request: &ServiceRequest) -> Result<(), RingletError>;

    async fn get_service_request(&self, id: &str)
        -> Result<Option<ServiceRequest>, RingletError>;

    /// Persists a lifecycle transition, optionally recording an outcome string.
    async fn update_request_state(
        &self,
        id: &str,
        state: LifecycleState,
        outcome: Option<&str>,
    ) -> Result<(), RingletError>;

    async fn save_recommendations(
        &self,
        id: &str,
        recommendations: &[RankedProvider],
    ) -> Result<(), RingletError>;

    async fn save_selection(&self, id: &str, provider_name: &str) -> Result<(), RingletError>;

    /// Records confirmed appointment fields after a successful booking.
    async fn save_appointment(
        &self,
        id: &str,
        provider_name: &str,
        date: Option<&str>,
        time: Option<&str>,
    ) -> Result<(), RingletError>;

    // --- Per-provider call status ---

    /// Inserts or replaces the status row for `(request_id, phone)`.
    async fn upsert_provider_call(&self, call: &ProviderCall) -> Result<(), RingletError>;

    /// Updates the status (and optionally the backend call id) for a
    /// provider row matched by call id.
    async fn update_provider_call_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> Result<(), RingletError>;

    async fn list_provider_calls(
        &self,
        request_id: &str,
    ) -> Result<Vec<ProviderCall>, RingletError>;

    // --- Call results ---

    async fn save_call_result(&self, result: &CallResult) -> Result<(), RingletError>;

    async fn get_call_result(&self, call_id: &str) -> Result<Option<CallResult>, RingletError>;

    // --- Interaction log ---

    /// Appends an audit entry. Entries are never mutated or deleted.
    async fn append_log(&self, entry: &InteractionLogEntry) -> Result<(), RingletError>;

    async fn list_log(&self, request_id: &str)
        -> Result<Vec<InteractionLogEntry>, RingletError>;
}
