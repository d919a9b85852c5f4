// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-bounded in-memory store of call result snapshots.
//!
//! Keyed by the voice backend's call id. Each entry wraps its payload in a
//! per-key `Mutex` so read-modify-write merges from the webhook intake and
//! the enrichment fetcher are serialized per call id; the map itself is a
//! `DashMap` so distinct call ids never contend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ringlet_core::types::{CallResult, FetchStatus};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::merge::merge_results;

/// One cached entry: payload plus its last-write stamp for TTL accounting.
struct CacheSlot {
    result: CallResult,
    last_write: Instant,
}

/// Summary of cache contents for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub partial: usize,
    pub fetching: usize,
    pub complete: usize,
    pub fetch_failed: usize,
}

/// Transient store of call results keyed by call id.
///
/// Entries expire a fixed TTL after their last write. Expiry is lazy
/// (checked on access) plus a periodic [`sweep`](ResultCache::sweep) driven
/// by the serve loop.
pub struct ResultCache {
    entries: DashMap<String, Arc<Mutex<CacheSlot>>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Upserts a snapshot for `result.call_id`.
    ///
    /// When the existing entry already reached `Complete`, the incoming
    /// snapshot only fills gaps: completeness is monotone and enriched data
    /// is never clobbered by a late partial notification.
    pub async fn set(&self, result: CallResult) {
        let call_id = result.call_id.clone();
        let slot = self.slot(&call_id);
        let mut guard = slot.lock().await;
        if guard.result.call_id.is_empty() {
            debug!(call_id, completeness = %result.completeness, "cache insert");
            guard.result = result;
        } else if guard.result.completeness == FetchStatus::Complete
            && result.completeness != FetchStatus::Complete
        {
            debug!(call_id, "cache set on complete entry; filling gaps only");
            guard.result = merge_results(&result, &guard.result);
        } else {
            guard.result = merge_results(&guard.result, &result);
        }
        guard.last_write = Instant::now();
    }

    /// Returns the current snapshot, or `None` if absent or expired.
    pub async fn get(&self, call_id: &str) -> Option<CallResult> {
        // Clone the Arc and release the shard guard before awaiting the lock.
        let slot = self.entries.get(call_id)?.value().clone();
        let guard = slot.lock().await;
        // A placeholder slot whose writer has not filled it yet is not a hit.
        if guard.result.call_id.is_empty() {
            return None;
        }
        if guard.last_write.elapsed() > self.ttl {
            drop(guard);
            self.entries.remove(call_id);
            debug!(call_id, "cache entry expired on access");
            return None;
        }
        Some(guard.result.clone())
    }

    /// Transitions an entry's completeness without touching its payload.
    ///
    /// Returns `false` when the entry is absent. A transition away from
    /// `Complete` is refused: completeness never regresses.
    pub async fn update_fetch_status(
        &self,
        call_id: &str,
        status: FetchStatus,
        reason: Option<&str>,
    ) -> bool {
        let Some(slot) = self.entries.get(call_id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut guard = slot.lock().await;
        if guard.result.completeness == FetchStatus::Complete && status != FetchStatus::Complete {
            warn!(call_id, requested = %status, "refusing completeness regression");
            return true;
        }
        debug!(call_id, from = %guard.result.completeness, to = %status, reason, "fetch status update");
        guard.result.completeness = status;
        guard.last_write = Instant::now();
        true
    }

    /// Merges an authoritative fetched record into the cached entry under the
    /// per-key lock, returning the merged snapshot.
    ///
    /// If the entry was evicted between notification and fetch completion,
    /// the fetched record is inserted as a fresh entry instead.
    pub async fn apply_merge(&self, call_id: &str, fetched: CallResult) -> CallResult {
        let slot = self.slot(call_id);
        let mut guard = slot.lock().await;
        if guard.result.call_id.is_empty() {
            debug!(call_id, "entry evicted before enrichment; inserting fetched record");
            guard.result = fetched;
        } else {
            guard.result = merge_results(&guard.result, &fetched);
        }
        guard.last_write = Instant::now();
        guard.result.clone()
    }

    /// Removes an entry. Returns `true` if it existed.
    pub async fn remove(&self, call_id: &str) -> bool {
        self.entries.remove(call_id).is_some()
    }

    /// Counts entries by completeness for the diagnostics endpoint.
    pub async fn stats(&self) -> CacheStats {
        let slots: Vec<Arc<Mutex<CacheSlot>>> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        let mut stats = CacheStats {
            size: slots.len(),
            partial: 0,
            fetching: 0,
            complete: 0,
            fetch_failed: 0,
        };
        for slot in slots {
            let guard = slot.lock().await;
            match guard.result.completeness {
                FetchStatus::Partial => stats.partial += 1,
                FetchStatus::Fetching => stats.fetching += 1,
                FetchStatus::Complete => stats.complete += 1,
                FetchStatus::FetchFailed => stats.fetch_failed += 1,
            }
        }
        stats
    }

    /// Evicts every entry whose TTL elapsed. Returns the evicted count.
    pub async fn sweep(&self) -> usize {
        let candidates: Vec<(String, Arc<Mutex<CacheSlot>>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let mut evicted = 0;
        for (call_id, slot) in candidates {
            let expired = slot.lock().await.last_write.elapsed() > self.ttl;
            if expired && self.entries.remove(&call_id).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(evicted, "cache sweep complete");
        }
        evicted
    }

    /// Returns the existing per-key slot or inserts an empty placeholder.
    ///
    /// The placeholder carries an empty call id so callers under the lock can
    /// distinguish fresh-insert from merge.
    fn slot(&self, call_id: &str) -> Arc<Mutex<CacheSlot>> {
        self.entries
            .entry(call_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(CacheSlot {
                    result: CallResult::partial(
                        "",
                        "",
                        "",
                        ringlet_core::CallStatus::Queued,
                        ringlet_core::DispatchMethod::Direct,
                    ),
                    last_write: Instant::now(),
                }))
            })
            .clone()
    }
}
