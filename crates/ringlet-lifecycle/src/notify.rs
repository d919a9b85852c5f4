// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default notifier implementation.
//!
//! Message formatting and delivery channels (SMS, email) live outside this
//! service; the default notifier records the notification in the log stream
//! so operators can verify the hand-off point.

use async_trait::async_trait;
use ringlet_core::types::ServiceRequest;
use ringlet_core::{Notifier, RingletError};
use tracing::info;

/// Notifier that logs instead of delivering.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, request: &ServiceRequest, message: &str) -> Result<(), RingletError> {
        info!(request_id = request.id, message, "user notification");
        Ok(())
    }
}
