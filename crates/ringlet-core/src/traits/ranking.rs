// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranking oracle trait: scores completed call results into a recommendation list.

use async_trait::async_trait;

use crate::error::RingletError;
use crate::types::{CallResult, RankedProvider, ServiceRequest};

/// Scores completed call results for a service request into a ranked list.
///
/// The lifecycle state machine composes two tiers: the flow engine's ranking
/// flow, then a direct reasoning-oracle call whenever tier 1 is unavailable
/// or returns an empty/invalid list.
#[async_trait]
pub trait RankingOracle: Send + Sync + 'static {
    /// Identifies the tier in logs ("flow", "model").
    fn name(&self) -> &str;

    /// Returns a non-empty ranked list, best candidate first.
    ///
    /// An empty list is treated by callers the same as an `Err`: the next
    /// tier is consulted.
    async fn rank(
        &self,
        request: &ServiceRequest,
        results: &[CallResult],
    ) -> Result<Vec<RankedProvider>, RingletError>;
}
