// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock ranking oracle and notifier.

use async_trait::async_trait;
use ringlet_core::types::{CallResult, CallStatus, RankedProvider, ServiceRequest};
use ringlet_core::{Notifier, RankingOracle, RingletError};
use tokio::sync::Mutex;

/// Ranking oracle that ranks every completed call in arrival order.
///
/// Can be scripted to fail, for exercising the ranking-failure path.
pub struct MockRanker {
    fail: bool,
}

impl MockRanker {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RankingOracle for MockRanker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn rank(
        &self,
        _request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError> {
        if self.fail {
            return Err(RingletError::Internal("scripted ranking failure".to_string()));
        }
        Ok(results
            .iter()
            .filter(|r| r.status == CallStatus::Completed)
            .enumerate()
            .map(|(i, r)| RankedProvider {
                rank: i + 1,
                provider_name: r.provider_name.clone(),
                phone: r.phone.clone(),
                provider_id: None,
                reason: "completed the call".to_string(),
                estimate: None,
            })
            .collect())
    }
}

/// Notifier that records every message for assertions.
#[derive(Default)]
pub struct MockNotifier {
    messages: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, _request: &ServiceRequest, message: &str) -> Result<(), RingletError> {
        self.messages.lock().await.push(message.to_string());
        Ok(())
    }
}
