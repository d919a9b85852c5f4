// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ringlet serve` command implementation.
//!
//! Wires the full orchestration stack: SQLite storage, result cache with its
//! sweep task, voice and flow backends, dispatcher, ranking tiers, lifecycle
//! runner, and the HTTP gateway. Supports graceful shutdown via signal
//! handlers: in-flight background tasks are drained before exit.

use std::sync::Arc;
use std::time::Duration;

use ringlet_config::model::RingletConfig;
use ringlet_core::{ExecutionBackend, RankingOracle, RingletError, Storage};
use ringlet_dispatch::{BackendStrategy, CallDispatcher};
use ringlet_flow::{FlowBackend, FlowClient, FlowRanker};
use ringlet_gateway::{GatewayState, ServerConfig};
use ringlet_lifecycle::{LifecycleRunner, LogNotifier, ModelRanker, TieredRanker};
use ringlet_results::{EnrichmentFetcher, ResultCache};
use ringlet_storage::SqliteStorage;
use ringlet_voice::VoiceBackend;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// Runs the `ringlet serve` command until a shutdown signal arrives.
pub async fn run_serve(config: RingletConfig) -> Result<(), RingletError> {
    init_tracing(&config.service.log_level);
    info!(service = config.service.name, "starting ringlet serve");

    // Storage.
    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    // Result cache and its periodic sweep task.
    let cache = Arc::new(ResultCache::new(Duration::from_secs(config.cache.ttl_secs)));
    let tracker = TaskTracker::new();
    let cancel = install_signal_handler();
    spawn_cache_sweeper(
        &tracker,
        cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
        cancel.clone(),
    );

    // Voice backend: direct execution path and authoritative record source.
    let voice = Arc::new(VoiceBackend::new(&config.voice)?);

    // Flow engine is optional; absent base_url disables the whole path.
    let flow_client = FlowClient::from_config(&config.flow)?.map(Arc::new);
    let flow_backend: Option<Arc<dyn ExecutionBackend>> = flow_client
        .clone()
        .map(|client| Arc::new(FlowBackend::new(client)) as Arc<dyn ExecutionBackend>);
    if flow_backend.is_some() {
        info!(base_url = config.flow.base_url, "flow engine configured");
    } else {
        debug!("no flow engine configured; direct execution only");
    }

    // Enrichment fetcher feeding the cache and durable storage.
    let fetcher = Arc::new(EnrichmentFetcher::new(
        cache.clone(),
        voice.clone(),
        storage.clone(),
        config.enrichment.clone(),
    ));

    // Dispatcher over the selected backend.
    let strategy = BackendStrategy::new(
        flow_backend,
        voice.clone() as Arc<dyn ExecutionBackend>,
        config.dispatch.prefer_flow,
        config.dispatch.strict_flow,
        Duration::from_millis(config.flow.health_timeout_ms),
    );
    let dispatcher = Arc::new(CallDispatcher::new(
        strategy,
        storage.clone(),
        tracker.clone(),
        config.dispatch.test_mode,
        config.dispatch.test_number_pool(),
    ));

    // Two-tier ranking: flow engine first, reasoning oracle as fallback.
    let mut tiers: Vec<Arc<dyn RankingOracle>> = Vec::new();
    if let Some(client) = flow_client {
        tiers.push(Arc::new(FlowRanker::new(client)));
    }
    tiers.push(Arc::new(ModelRanker::new(&config.ranker)?));
    let ranker: Arc<dyn RankingOracle> = Arc::new(TieredRanker::new(tiers));

    // Lifecycle runner.
    let runner = Arc::new(LifecycleRunner::new(
        storage.clone(),
        dispatcher.clone(),
        ranker,
        Arc::new(LogNotifier),
        config.lifecycle.clone(),
        config.dispatch.max_concurrent,
        tracker.clone(),
    ));

    // Gateway.
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };
    let state = GatewayState {
        cache,
        fetcher,
        dispatcher,
        runner,
        storage: storage.clone(),
        tracker: tracker.clone(),
        start_time: std::time::Instant::now(),
    };

    tokio::select! {
        result = ringlet_gateway::start_server(&server_config, state) => {
            result?;
        }
        _ = cancel.cancelled() => {
            info!("shutdown signal received, stopping gateway");
        }
    }

    // Drain in-flight background work, then close storage.
    tracker.close();
    tracker.wait().await;
    storage.close().await?;
    info!("ringlet serve stopped");
    Ok(())
}

/// Initializes the tracing subscriber with an env-filter default.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ringlet={log_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Installs handlers for SIGTERM and SIGINT (Ctrl+C).
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    token_clone.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Spawns the periodic cache eviction sweep.
fn spawn_cache_sweeper(
    tracker: &TaskTracker,
    cache: Arc<ResultCache>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracker.spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let evicted = cache.sweep().await;
                    if evicted > 0 {
                        debug!(evicted, "cache sweeper evicted expired entries");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("cache sweeper stopping");
                    break;
                }
            }
        }
    });
}
