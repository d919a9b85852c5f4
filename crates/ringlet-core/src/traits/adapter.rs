// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by all external-backend adapters.

use async_trait::async_trait;

use crate::error::RingletError;
use crate::types::HealthStatus;

/// The base trait for all Ringlet backend adapters.
///
/// Every adapter (execution backend, storage) implements this trait, which
/// provides identity, health-check, and shutdown capabilities. Health checks
/// must be cheap: callers run them behind short timeouts on the dispatch path.
#[async_trait]
pub trait BackendAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, RingletError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), RingletError> {
        Ok(())
    }
}
