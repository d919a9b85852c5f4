// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait for best-effort user-facing notifications.

use async_trait::async_trait;

use crate::error::RingletError;
use crate::types::ServiceRequest;

/// Sends a user-facing notification about a service request.
///
/// Notification delivery is always best-effort: a failure is logged by the
/// caller and never blocks or reverts a lifecycle transition.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, request: &ServiceRequest, message: &str) -> Result<(), RingletError>;
}
