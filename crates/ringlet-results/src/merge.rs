// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Richer-record-wins merge for call results.

use ringlet_core::types::{CallResult, FetchStatus};

/// Merges an authoritative `fetched` record on top of the `original` cached
/// snapshot.
///
/// Fields present in the fetched record win; fields it lacks fall back to
/// whatever the original already had, so data received via webhook is never
/// discarded. Completeness is monotone: once the original reached
/// `Complete`, the merge result stays `Complete` regardless of what the
/// fetched record claims.
pub fn merge_results(original: &CallResult, fetched: &CallResult) -> CallResult {
    let completeness = if original.completeness == FetchStatus::Complete {
        FetchStatus::Complete
    } else {
        fetched.completeness
    };

    CallResult {
        call_id: original.call_id.clone(),
        request_id: fetched.request_id.clone().or_else(|| original.request_id.clone()),
        provider_name: if fetched.provider_name.is_empty() {
            original.provider_name.clone()
        } else {
            fetched.provider_name.clone()
        },
        phone: if fetched.phone.is_empty() {
            original.phone.clone()
        } else {
            fetched.phone.clone()
        },
        // A terminal status from either side beats a transient one.
        status: if fetched.status.is_terminal() || !original.status.is_terminal() {
            fetched.status
        } else {
            original.status
        },
        method: original.method,
        duration_secs: fetched.duration_secs.or(original.duration_secs),
        ended_reason: fetched.ended_reason.clone().or_else(|| original.ended_reason.clone()),
        transcript: fetched.transcript.clone().or_else(|| original.transcript.clone()),
        analysis: fetched.analysis.clone().or_else(|| original.analysis.clone()),
        cost: fetched.cost.or(original.cost),
        completeness,
        received_at: original.received_at,
        enriched_at: fetched.enriched_at.or(original.enriched_at),
    }
}
