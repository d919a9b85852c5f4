// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background enrichment of partial call results.
//!
//! Webhook notifications arrive with incomplete data: the transcript and
//! analysis often lag the completion event by several seconds on the voice
//! backend. The [`EnrichmentFetcher`] retries the authoritative record
//! endpoint on an increasing delay schedule until a completeness predicate
//! is satisfied, then merges the record into the cache and hands it to
//! durable persistence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ringlet_config::model::EnrichmentConfig;
use ringlet_core::types::{CallResult, FetchStatus};
use ringlet_core::{CallRecordSource, Storage};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::cache::ResultCache;

/// Placeholder transcripts the voice backend serves before processing finishes.
const PLACEHOLDER_TRANSCRIPTS: [&str; 3] =
    ["transcript not available", "processing", "n/a"];

/// Decides whether an authoritative record is complete enough to stop retrying.
///
/// Requires a non-placeholder transcript and a non-empty analysis block.
pub fn is_complete_record(result: &CallResult) -> bool {
    let transcript_ok = result
        .transcript
        .as_deref()
        .map(|t| {
            let trimmed = t.trim();
            !trimmed.is_empty()
                && !PLACEHOLDER_TRANSCRIPTS
                    .iter()
                    .any(|p| trimmed.eq_ignore_ascii_case(p))
        })
        .unwrap_or(false);
    let analysis_ok = result.analysis.as_ref().is_some_and(|a| !a.is_empty());
    transcript_ok && analysis_ok
}

/// Bounded-retry background fetcher for authoritative call records.
pub struct EnrichmentFetcher {
    cache: Arc<ResultCache>,
    records: Arc<dyn CallRecordSource>,
    storage: Arc<dyn Storage>,
    config: EnrichmentConfig,
}

impl EnrichmentFetcher {
    pub fn new(
        cache: Arc<ResultCache>,
        records: Arc<dyn CallRecordSource>,
        storage: Arc<dyn Storage>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            cache,
            records,
            storage,
            config,
        }
    }

    /// Spawns an enrichment run for `call_id` on the shared task tracker.
    pub fn spawn(self: &Arc<Self>, tracker: &TaskTracker, call_id: String) {
        let fetcher = self.clone();
        tracker.spawn(async move {
            fetcher.enrich(&call_id).await;
        });
    }

    /// Runs the enrichment loop for one call id.
    ///
    /// Never returns an error: enrichment failure degrades data completeness
    /// but is not user-visible. Data already received is never discarded.
    pub async fn enrich(&self, call_id: &str) {
        self.cache
            .update_fetch_status(call_id, FetchStatus::Fetching, None)
            .await;

        let mut last_failure = String::from("record never satisfied completeness predicate");
        for attempt in 1..=self.config.max_attempts {
            let delay = self.delay_for_attempt(attempt);
            debug!(call_id, attempt, delay_ms = delay.as_millis() as u64, "enrichment attempt");
            tokio::time::sleep(delay).await;

            match self.records.fetch_call(call_id).await {
                Ok(record) if is_complete_record(&record) => {
                    let mut record = record;
                    record.completeness = FetchStatus::Complete;
                    record.enriched_at = Some(Utc::now());
                    let merged = self.cache.apply_merge(call_id, record).await;
                    info!(call_id, attempt, "call result enriched to complete");
                    self.persist(&merged).await;
                    return;
                }
                Ok(_) => {
                    debug!(call_id, attempt, "record still incomplete");
                }
                Err(e) => {
                    warn!(call_id, attempt, error = %e, "record fetch failed");
                    last_failure = e.to_string();
                }
            }
        }

        warn!(
            call_id,
            attempts = self.config.max_attempts,
            "enrichment exhausted; keeping partial data"
        );
        self.cache
            .update_fetch_status(call_id, FetchStatus::FetchFailed, Some(&last_failure))
            .await;
        // The partial snapshot is still worth persisting for ranking input.
        if let Some(partial) = self.cache.get(call_id).await {
            self.persist(&partial).await;
        }
    }

    /// Durable persistence hand-off. Failure is logged, never fatal: the
    /// cache already holds the merged record.
    async fn persist(&self, result: &CallResult) {
        if let Err(e) = self.storage.save_call_result(result).await {
            warn!(call_id = result.call_id, error = %e, "failed to persist call result");
        }
    }

    /// Delay before the given 1-based attempt. When the schedule is shorter
    /// than the attempt count the last entry repeats.
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let delays = &self.config.delays_ms;
        let ms = delays
            .get(attempt.saturating_sub(1))
            .or_else(|| delays.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use ringlet_config::model::StorageConfig;
    use ringlet_core::RingletError;
    use ringlet_core::types::{CallAnalysis, CallStatus, DispatchMethod};
    use ringlet_storage::SqliteStorage;
    use tempfile::TempDir;

    /// Scripted record source: pops one response per fetch, repeating the
    /// last response once the script runs out.
    struct ScriptedRecords {
        responses: tokio::sync::Mutex<VecDeque<Result<CallResult, RingletError>>>,
    }

    impl ScriptedRecords {
        fn new(responses: Vec<Result<CallResult, RingletError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: tokio::sync::Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl CallRecordSource for ScriptedRecords {
        async fn fetch_call(&self, call_id: &str) -> Result<CallResult, RingletError> {
            let mut responses = self.responses.lock().await;
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                match responses.front() {
                    Some(Ok(r)) => Ok(r.clone()),
                    Some(Err(e)) => Err(RingletError::voice(e.to_string())),
                    None => Err(RingletError::NotFound(call_id.to_string())),
                }
            }
        }
    }

    fn partial_result(call_id: &str) -> CallResult {
        let mut r = CallResult::partial(
            call_id,
            "Apex Plumbing",
            "+15550000001",
            CallStatus::Completed,
            DispatchMethod::Direct,
        );
        r.transcript = Some("partial".to_string());
        r
    }

    fn complete_record(call_id: &str) -> CallResult {
        let mut r = partial_result(call_id);
        r.transcript = Some("Full transcript: we can come Tuesday at 2pm.".to_string());
        r.analysis = Some(CallAnalysis {
            summary: Some("available tuesday".to_string()),
            structured: None,
            success_evaluation: Some("true".to_string()),
        });
        r.duration_secs = Some(88.0);
        r
    }

    fn incomplete_record(call_id: &str) -> CallResult {
        let mut r = partial_result(call_id);
        r.transcript = Some("Transcript not available".to_string());
        r
    }

    fn fast_config(max_attempts: usize) -> EnrichmentConfig {
        EnrichmentConfig {
            max_attempts,
            delays_ms: vec![1, 1, 1],
        }
    }

    async fn temp_storage() -> (TempDir, Arc<SqliteStorage>) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn completeness_predicate_rejects_placeholders() {
        assert!(is_complete_record(&complete_record("c")));
        assert!(!is_complete_record(&incomplete_record("c")));
        assert!(!is_complete_record(&partial_result("c")));

        // A real transcript without an analysis block is still incomplete.
        let mut r = complete_record("c");
        r.analysis = None;
        assert!(!is_complete_record(&r));
    }

    #[tokio::test]
    async fn enrich_succeeds_once_record_becomes_complete() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        cache.set(partial_result("call-1")).await;
        let (_guard, storage) = temp_storage().await;

        let records = ScriptedRecords::new(vec![
            Ok(incomplete_record("call-1")),
            Ok(complete_record("call-1")),
        ]);
        let fetcher =
            EnrichmentFetcher::new(cache.clone(), records, storage.clone(), fast_config(3));
        fetcher.enrich("call-1").await;

        let snapshot = cache.get("call-1").await.unwrap();
        assert_eq!(snapshot.completeness, FetchStatus::Complete);
        assert!(snapshot.enriched_at.is_some());
        assert!(snapshot.transcript.unwrap().contains("Tuesday"));

        // Durable persistence received the merged record.
        let persisted = storage.get_call_result("call-1").await.unwrap().unwrap();
        assert_eq!(persisted.completeness, FetchStatus::Complete);
    }

    #[tokio::test]
    async fn enrich_exhaustion_keeps_partial_and_marks_fetch_failed() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        cache.set(partial_result("call-1")).await;
        let (_guard, storage) = temp_storage().await;

        let records = ScriptedRecords::new(vec![Ok(incomplete_record("call-1"))]);
        let fetcher = EnrichmentFetcher::new(cache.clone(), records, storage, fast_config(3));
        fetcher.enrich("call-1").await;

        let snapshot = cache.get("call-1").await.expect("entry must not be deleted");
        assert_eq!(snapshot.completeness, FetchStatus::FetchFailed);
        assert_eq!(snapshot.transcript.as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn enrich_constructs_fresh_record_when_entry_was_evicted() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        let (_guard, storage) = temp_storage().await;

        let records = ScriptedRecords::new(vec![Ok(complete_record("call-9"))]);
        let fetcher = EnrichmentFetcher::new(cache.clone(), records, storage, fast_config(1));
        fetcher.enrich("call-9").await;

        let snapshot = cache.get("call-9").await.expect("fresh record inserted");
        assert_eq!(snapshot.completeness, FetchStatus::Complete);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_lose_cache_update() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        cache.set(partial_result("call-1")).await;
        // Uninitialized storage: every save fails.
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: "/nonexistent/ringlet.db".to_string(),
            wal_mode: false,
        }));

        let records = ScriptedRecords::new(vec![Ok(complete_record("call-1"))]);
        let fetcher = EnrichmentFetcher::new(cache.clone(), records, storage, fast_config(1));
        fetcher.enrich("call-1").await;

        let snapshot = cache.get("call-1").await.unwrap();
        assert_eq!(snapshot.completeness, FetchStatus::Complete);
    }
}
