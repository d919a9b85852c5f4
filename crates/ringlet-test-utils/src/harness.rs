// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete orchestration stack with a mock
//! execution backend, temp SQLite database, result cache, dispatcher, and
//! lifecycle runner. Poll windows are shortened to keep tests fast.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ringlet_config::model::{EnrichmentConfig, LifecycleConfig, StorageConfig};
use ringlet_core::types::{CallRequest, LifecycleState, ServiceRequest, Urgency};
use ringlet_core::{ExecutionBackend, RankingOracle, RingletError, Storage};
use ringlet_dispatch::{BackendStrategy, CallDispatcher};
use ringlet_lifecycle::{LifecycleRunner, TieredRanker};
use ringlet_results::{EnrichmentFetcher, ResultCache};
use ringlet_storage::SqliteStorage;
use tokio_util::task::TaskTracker;

use crate::mock_backend::MockCallBackend;
use crate::mock_oracles::{MockNotifier, MockRanker};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    ranker_fails: bool,
    strict_flow: bool,
    flow: Option<Arc<dyn ExecutionBackend>>,
    poll_max_attempts: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            ranker_fails: false,
            strict_flow: false,
            flow: None,
            poll_max_attempts: 50,
        }
    }

    /// Make the ranking oracle fail, exercising the no-recommendations path.
    pub fn with_failing_ranker(mut self) -> Self {
        self.ranker_fails = true;
        self
    }

    /// Install a flow backend and optionally require it (strict mode).
    pub fn with_flow(mut self, flow: Arc<dyn ExecutionBackend>, strict: bool) -> Self {
        self.flow = Some(flow);
        self.strict_flow = strict;
        self
    }

    /// Shrink the calling-gate poll window.
    pub fn with_poll_attempts(mut self, attempts: usize) -> Self {
        self.poll_max_attempts = attempts;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, RingletError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RingletError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await?;
        let storage_dyn: Arc<dyn Storage> = storage.clone();

        let cache = Arc::new(ResultCache::new(Duration::from_secs(60)));
        let backend = MockCallBackend::new();
        let tracker = TaskTracker::new();

        let fetcher = Arc::new(EnrichmentFetcher::new(
            cache.clone(),
            backend.clone(),
            storage_dyn.clone(),
            EnrichmentConfig {
                max_attempts: 2,
                delays_ms: vec![1, 1],
            },
        ));

        let strategy = BackendStrategy::new(
            self.flow,
            backend.clone() as Arc<dyn ExecutionBackend>,
            true,
            self.strict_flow,
            Duration::from_millis(100),
        );
        let dispatcher = Arc::new(CallDispatcher::new(
            strategy,
            storage_dyn.clone(),
            tracker.clone(),
            false,
            Vec::new(),
        ));

        let ranker: Arc<dyn RankingOracle> = if self.ranker_fails {
            Arc::new(MockRanker::failing())
        } else {
            Arc::new(TieredRanker::new(vec![
                Arc::new(MockRanker::new()) as Arc<dyn RankingOracle>,
            ]))
        };
        let notifier = Arc::new(MockNotifier::new());

        let runner = Arc::new(LifecycleRunner::new(
            storage_dyn.clone(),
            dispatcher.clone(),
            ranker,
            notifier.clone(),
            LifecycleConfig {
                poll_interval_ms: 20,
                poll_max_attempts: self.poll_max_attempts,
                booking_poll_interval_ms: 20,
                booking_poll_max_attempts: 50,
            },
            5,
            tracker.clone(),
        ));

        Ok(TestHarness {
            storage,
            cache,
            backend,
            dispatcher,
            runner,
            fetcher,
            notifier,
            tracker,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete orchestration stack on temp storage with mock backends.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    pub cache: Arc<ResultCache>,
    pub backend: Arc<MockCallBackend>,
    pub dispatcher: Arc<CallDispatcher>,
    pub runner: Arc<LifecycleRunner>,
    pub fetcher: Arc<EnrichmentFetcher>,
    pub notifier: Arc<MockNotifier>,
    pub tracker: TaskTracker,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Creates a service request with the given `(name, phone)` candidates
    /// and starts its lifecycle run.
    pub async fn create_request(
        &self,
        providers: &[(&str, &str)],
    ) -> Result<ServiceRequest, RingletError> {
        let now = Utc::now();
        let request = ServiceRequest {
            id: uuid_like(),
            service_type: "plumbing".to_string(),
            description: "leaking kitchen sink".to_string(),
            urgency: Urgency::Normal,
            address: "12 Canal St".to_string(),
            state: LifecycleState::Pending,
            selected_provider: None,
            recommendations: None,
            outcome: None,
            appointment_date: None,
            appointment_time: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_service_request(&request).await?;

        let candidates = providers
            .iter()
            .map(|(name, phone)| CallRequest {
                provider_name: name.to_string(),
                phone: phone.to_string(),
                provider_id: None,
                service_type: request.service_type.clone(),
                problem: request.description.clone(),
                urgency: request.urgency,
                address: request.address.clone(),
                prompt_override: None,
                request_id: Some(request.id.clone()),
            })
            .collect();

        self.runner.start(request.clone(), candidates)?;
        Ok(request)
    }

    /// Polls storage until the request reaches `state`, panicking after the
    /// deadline with the state it was stuck in.
    pub async fn wait_for_state(&self, request_id: &str, state: LifecycleState) -> ServiceRequest {
        let mut last = None;
        for _ in 0..250 {
            if let Some(request) = self
                .storage
                .get_service_request(request_id)
                .await
                .expect("storage read")
            {
                if request.state == state {
                    return request;
                }
                last = Some(request.state);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("request {request_id} never reached {state}; last state: {last:?}");
    }

    /// Waits for all background tasks (dispatch, enrichment, lifecycle runs)
    /// to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Unique-enough id without pulling uuid into the harness.
fn uuid_like() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "req-{}-{}",
        Utc::now().timestamp_micros(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}
