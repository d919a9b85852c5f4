// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for backend selection and batch dispatch.
//!
//! Backends are stubbed in-process; storage is a real temp SQLite database.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ringlet_config::model::StorageConfig;
use ringlet_core::types::{
    BatchOptions, BatchResult, CallRequest, CallResult, CallStatus, DispatchError,
    DispatchMethod, HealthStatus, Urgency,
};
use ringlet_core::{BackendAdapter, ExecutionBackend, RingletError, Storage};
use ringlet_dispatch::{BackendStrategy, CallDispatcher};
use ringlet_storage::SqliteStorage;
use tempfile::TempDir;
use tokio_util::task::TaskTracker;

/// Stub execution backend with a scripted health status and call outcome.
struct StubBackend {
    name: &'static str,
    method: DispatchMethod,
    health: HealthStatus,
    outcome: CallStatus,
    executed: AtomicUsize,
    seen_phones: std::sync::Mutex<Vec<String>>,
}

impl StubBackend {
    fn new(name: &'static str, method: DispatchMethod, health: HealthStatus) -> Arc<Self> {
        Arc::new(Self {
            name,
            method,
            health,
            outcome: CallStatus::Completed,
            executed: AtomicUsize::new(0),
            seen_phones: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendAdapter for StubBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn health_check(&self) -> Result<HealthStatus, RingletError> {
        Ok(self.health.clone())
    }
}

#[async_trait]
impl ExecutionBackend for StubBackend {
    fn method(&self) -> DispatchMethod {
        self.method
    }

    async fn execute_call(&self, request: &CallRequest) -> Result<CallResult, RingletError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.seen_phones.lock().unwrap().push(request.phone.clone());
        if request.phone == "reject-me" {
            return Err(RingletError::voice("backend rejected number"));
        }
        let mut result = CallResult::partial(
            format!("{}-{}", self.name, request.phone),
            request.provider_name.clone(),
            request.phone.clone(),
            self.outcome,
            self.method,
        );
        result.request_id = request.request_id.clone();
        Ok(result)
    }

    async fn run_batch(
        &self,
        requests: &[CallRequest],
        _options: &BatchOptions,
    ) -> Result<BatchResult, RingletError> {
        let mut results = Vec::new();
        let mut errors = Vec::new();
        for request in requests {
            match self.execute_call(request).await {
                Ok(result) => results.push(result),
                Err(e) => errors.push(DispatchError {
                    provider_name: request.provider_name.clone(),
                    phone: request.phone.clone(),
                    message: e.to_string(),
                }),
            }
        }
        Ok(BatchResult::from_parts(results, errors))
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

fn request(phone: &str, request_id: Option<&str>) -> CallRequest {
    CallRequest {
        provider_name: format!("Provider {phone}"),
        phone: phone.to_string(),
        provider_id: None,
        service_type: "plumbing".to_string(),
        problem: "leaking sink".to_string(),
        urgency: Urgency::Normal,
        address: "12 Canal St".to_string(),
        prompt_override: None,
        request_id: request_id.map(str::to_string),
    }
}

fn dispatcher(
    flow: Option<Arc<StubBackend>>,
    direct: Arc<StubBackend>,
    strict: bool,
    storage: Arc<SqliteStorage>,
) -> Arc<CallDispatcher> {
    let strategy = BackendStrategy::new(
        flow.map(|f| f as Arc<dyn ExecutionBackend>),
        direct as Arc<dyn ExecutionBackend>,
        true,
        strict,
        Duration::from_millis(200),
    );
    Arc::new(CallDispatcher::new(
        strategy,
        storage,
        TaskTracker::new(),
        false,
        Vec::new(),
    ))
}

#[tokio::test]
async fn healthy_flow_engine_takes_the_batch() {
    let (_guard, storage) = temp_storage().await;
    let flow = StubBackend::new("flow", DispatchMethod::Flow, HealthStatus::Healthy);
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let dispatcher = dispatcher(Some(flow.clone()), direct.clone(), false, storage);

    let batch = dispatcher
        .dispatch_batch(
            &[request("+15550000001", None), request("+15550000002", None)],
            &BatchOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(batch.completed, 2);
    assert_eq!(flow.executed(), 2);
    assert_eq!(direct.executed(), 0);
}

#[tokio::test]
async fn unhealthy_flow_engine_falls_back_to_direct() {
    let (_guard, storage) = temp_storage().await;
    let flow = StubBackend::new(
        "flow",
        DispatchMethod::Flow,
        HealthStatus::Unhealthy("connection refused".to_string()),
    );
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let dispatcher = dispatcher(Some(flow.clone()), direct.clone(), false, storage);

    let batch = dispatcher
        .dispatch_batch(&[request("+15550000001", None)], &BatchOptions::default())
        .await
        .unwrap();

    assert_eq!(batch.completed, 1);
    assert_eq!(flow.executed(), 0);
    assert_eq!(direct.executed(), 1);
}

#[tokio::test]
async fn strict_mode_fails_fast_without_touching_direct_backend() {
    let (_guard, storage) = temp_storage().await;
    let flow = StubBackend::new(
        "flow",
        DispatchMethod::Flow,
        HealthStatus::Unhealthy("engine down".to_string()),
    );
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let dispatcher = dispatcher(Some(flow), direct.clone(), true, storage);

    let err = dispatcher
        .dispatch_batch(&[request("+15550000001", None)], &BatchOptions::default())
        .await
        .expect_err("strict mode must fail fast");

    assert!(matches!(err, RingletError::FlowRequired(_)));
    assert_eq!(direct.executed(), 0, "direct backend must not run in strict mode");
}

#[tokio::test]
async fn per_item_failure_does_not_fail_the_batch() {
    let (_guard, storage) = temp_storage().await;
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let dispatcher = dispatcher(None, direct, false, storage);

    let requests = vec![
        request("+15550000001", None),
        request("+15550000002", None),
        request("reject-me", None),
        request("+15550000004", None),
        request("+15550000005", None),
    ];
    let batch = dispatcher
        .dispatch_batch(&requests, &BatchOptions::default())
        .await
        .expect("batch must not throw for one bad item");

    assert_eq!(batch.results.len(), 4);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].phone, "reject-me");
}

#[tokio::test]
async fn dispatch_one_executes_and_persists_the_result() {
    let (_guard, storage) = temp_storage().await;
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let dispatcher = dispatcher(None, direct, false, storage.clone());

    let result = dispatcher
        .dispatch_one(&request("+15550000001", None))
        .await
        .unwrap();
    assert_eq!(result.status, CallStatus::Completed);

    let persisted = storage.get_call_result(&result.call_id).await.unwrap();
    assert!(persisted.is_some());
}

#[tokio::test]
async fn test_mode_substitutes_safe_numbers_round_robin() {
    let (_guard, storage) = temp_storage().await;
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let strategy = BackendStrategy::new(
        None,
        direct.clone() as Arc<dyn ExecutionBackend>,
        false,
        false,
        Duration::from_millis(200),
    );
    let dispatcher = Arc::new(CallDispatcher::new(
        strategy,
        storage,
        TaskTracker::new(),
        true,
        vec!["+15559990001".to_string(), "+15559990002".to_string()],
    ));

    dispatcher
        .dispatch_batch(
            &[
                request("+14165551234", None),
                request("+14165555678", None),
                request("+14165559999", None),
            ],
            &BatchOptions::default(),
        )
        .await
        .unwrap();

    let seen = direct.seen_phones.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec!["+15559990001", "+15559990002", "+15559990001"],
        "real numbers must never reach the backend in test mode"
    );
}

#[tokio::test]
async fn async_dispatch_marks_queued_then_terminal() {
    let (_guard, storage) = temp_storage().await;
    let direct = StubBackend::new("voice", DispatchMethod::Direct, HealthStatus::Healthy);
    let tracker = TaskTracker::new();
    let strategy = BackendStrategy::new(
        None,
        direct as Arc<dyn ExecutionBackend>,
        false,
        false,
        Duration::from_millis(200),
    );
    let dispatcher = Arc::new(CallDispatcher::new(
        strategy,
        storage.clone(),
        tracker.clone(),
        false,
        Vec::new(),
    ));

    // Seed the parent request so the provider rows have an owner.
    let ticket = dispatcher
        .dispatch_batch_async(
            vec![
                request("+15550000001", Some("req-1")),
                request("+15550000002", Some("req-1")),
            ],
            BatchOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ticket.items, 2);
    assert!(!ticket.execution_id.is_empty());

    // Rows exist (queued or already terminal) the moment the ticket returns.
    let rows = storage.list_provider_calls("req-1").await.unwrap();
    assert_eq!(rows.len(), 2);

    // Once the tracker drains, every row is terminal with a call id.
    tracker.close();
    tracker.wait().await;
    let rows = storage.list_provider_calls("req-1").await.unwrap();
    assert!(rows.iter().all(|r| r.status.is_terminal()));
    assert!(rows.iter().all(|r| r.call_id.is_some()));

    // The call results were persisted durably too.
    for row in rows {
        let call_id = row.call_id.unwrap();
        assert!(storage.get_call_result(&call_id).await.unwrap().is_some());
    }
}
