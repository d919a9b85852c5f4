// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution backend selection.
//!
//! The strategy consults the flow engine's health probe (behind a short
//! timeout) and picks between the flow and direct backends per batch.
//! Strict mode is a flag on the strategy, not a separate code path: it only
//! changes what happens when the preferred engine is unavailable.

use std::sync::Arc;
use std::time::Duration;

use ringlet_core::types::HealthStatus;
use ringlet_core::{ExecutionBackend, RingletError};
use tracing::{debug, warn};

/// Picks the execution backend for each dispatch.
pub struct BackendStrategy {
    flow: Option<Arc<dyn ExecutionBackend>>,
    direct: Arc<dyn ExecutionBackend>,
    prefer_flow: bool,
    strict_flow: bool,
    probe_timeout: Duration,
}

impl BackendStrategy {
    pub fn new(
        flow: Option<Arc<dyn ExecutionBackend>>,
        direct: Arc<dyn ExecutionBackend>,
        prefer_flow: bool,
        strict_flow: bool,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            flow,
            direct,
            prefer_flow,
            strict_flow,
            probe_timeout,
        }
    }

    /// Selects the backend for one dispatch.
    ///
    /// With strict mode set, an unavailable or unhealthy flow engine is a
    /// hard error: the caller must not silently execute via the direct path.
    pub async fn select(&self) -> Result<Arc<dyn ExecutionBackend>, RingletError> {
        if !self.prefer_flow && !self.strict_flow {
            return Ok(self.direct.clone());
        }

        let Some(flow) = self.flow.clone() else {
            if self.strict_flow {
                return Err(RingletError::FlowRequired(
                    "no flow engine configured".to_string(),
                ));
            }
            return Ok(self.direct.clone());
        };

        let probe = tokio::time::timeout(self.probe_timeout, flow.health_check()).await;
        let reason = match probe {
            Ok(Ok(HealthStatus::Healthy)) | Ok(Ok(HealthStatus::Degraded(_))) => {
                debug!("flow engine healthy; delegating batch");
                return Ok(flow);
            }
            Ok(Ok(HealthStatus::Unhealthy(reason))) => reason,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("health probe timed out after {:?}", self.probe_timeout),
        };

        if self.strict_flow {
            return Err(RingletError::FlowRequired(reason));
        }
        warn!(reason, "flow engine unavailable; falling back to direct execution");
        Ok(self.direct.clone())
    }
}
