// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use ringlet_core::{RingletError, Storage};
use ringlet_dispatch::CallDispatcher;
use ringlet_lifecycle::LifecycleRunner;
use ringlet_results::{EnrichmentFetcher, ResultCache};
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub cache: Arc<ResultCache>,
    pub fetcher: Arc<EnrichmentFetcher>,
    pub dispatcher: Arc<CallDispatcher>,
    pub runner: Arc<LifecycleRunner>,
    pub storage: Arc<dyn Storage>,
    /// Tracker for detached webhook-processing tasks.
    pub tracker: TaskTracker,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from ringlet-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the `/v1` routes (None = auth disabled).
    pub bearer_token: Option<String>,
}

/// Builds the gateway router with public and authenticated route groups.
pub fn build_router(config: &ServerConfig, state: GatewayState) -> Router {
    let auth_state = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };

    // Unauthenticated public routes (liveness for systemd and load balancers).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    // Routes requiring authentication.
    let api_routes = Router::new()
        .route("/v1/events/calls", post(handlers::post_call_event))
        .route("/v1/calls", get(handlers::get_cache_stats))
        .route("/v1/calls/{call_id}", get(handlers::get_call))
        .route("/v1/calls/{call_id}", delete(handlers::delete_call))
        .route("/v1/dispatch", post(handlers::post_dispatch))
        .route("/v1/dispatch/async", post(handlers::post_dispatch_async))
        .route("/v1/requests", post(handlers::post_request))
        .route("/v1/requests/{request_id}/status", get(handlers::get_request_status))
        .route("/v1/requests/{request_id}/log", get(handlers::get_request_log))
        .route("/v1/requests/{request_id}/select", post(handlers::post_select))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), RingletError> {
    let app = build_router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RingletError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| RingletError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
