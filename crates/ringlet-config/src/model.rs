// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ringlet call-orchestration service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Ringlet configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RingletConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Call dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Background enrichment fetcher settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Call result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Lifecycle state machine poll windows.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Voice backend (call-execution API) settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Flow engine (workflow orchestration backend) settings.
    #[serde(default)]
    pub flow: FlowConfig,

    /// Tier-2 reasoning oracle settings.
    #[serde(default)]
    pub ranker: RankerConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "ringlet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Call dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Prefer the flow engine over direct execution when it is healthy.
    #[serde(default = "default_true")]
    pub prefer_flow: bool,

    /// Treat an unhealthy flow engine as a hard dispatch failure instead of
    /// silently falling back to direct execution.
    #[serde(default)]
    pub strict_flow: bool,

    /// Concurrent outbound calls per batch. Clamped to [1, 10] at use.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Substitute the safe test-number pool for all outbound phones.
    /// Never enable in production.
    #[serde(default)]
    pub test_mode: bool,

    /// Comma-separated pool of safe phone numbers used in test mode.
    #[serde(default)]
    pub test_numbers: Option<String>,
}

impl DispatchConfig {
    /// Parses the comma-separated test-number pool, dropping empty segments.
    pub fn test_number_pool(&self) -> Vec<String> {
        self.test_numbers
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            prefer_flow: true,
            strict_flow: false,
            max_concurrent: default_max_concurrent(),
            test_mode: false,
            test_numbers: None,
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Background enrichment fetcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichmentConfig {
    /// Maximum fetch attempts per notification.
    #[serde(default = "default_enrichment_attempts")]
    pub max_attempts: usize,

    /// Wait before each attempt, in milliseconds. When there are more
    /// attempts than entries, the last entry repeats.
    #[serde(default = "default_enrichment_delays")]
    pub delays_ms: Vec<u64>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_enrichment_attempts(),
            delays_ms: default_enrichment_delays(),
        }
    }
}

fn default_enrichment_attempts() -> usize {
    3
}

fn default_enrichment_delays() -> Vec<u64> {
    vec![3_000, 5_000, 8_000]
}

/// Call result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry time-to-live measured from last write, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Interval between periodic eviction sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    1_800
}

fn default_sweep_interval() -> u64 {
    300
}

/// Lifecycle state machine poll windows.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Interval between calling-gate status polls, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum calling-gate polls before the request fails with a timeout.
    #[serde(default = "default_poll_attempts")]
    pub poll_max_attempts: usize,

    /// Interval between booking-call completion polls, in milliseconds.
    #[serde(default = "default_booking_poll_interval")]
    pub booking_poll_interval_ms: u64,

    /// Maximum booking-call polls before the booking attempt is abandoned.
    #[serde(default = "default_booking_poll_attempts")]
    pub booking_poll_max_attempts: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            poll_max_attempts: default_poll_attempts(),
            booking_poll_interval_ms: default_booking_poll_interval(),
            booking_poll_max_attempts: default_booking_poll_attempts(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2_000
}

fn default_poll_attempts() -> usize {
    15
}

fn default_booking_poll_interval() -> u64 {
    10_000
}

fn default_booking_poll_attempts() -> usize {
    30
}

/// Voice backend (call-execution API) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Base URL of the voice backend API.
    #[serde(default = "default_voice_base_url")]
    pub base_url: String,

    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_voice_timeout")]
    pub request_timeout_secs: u64,

    /// Interval between authoritative-record polls while a directly
    /// executed call is in flight, in milliseconds.
    #[serde(default = "default_call_poll_interval")]
    pub call_poll_interval_ms: u64,

    /// Maximum record polls before a directly executed call is marked timed out.
    #[serde(default = "default_call_poll_attempts")]
    pub call_poll_max_attempts: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_voice_base_url(),
            api_key: None,
            request_timeout_secs: default_voice_timeout(),
            call_poll_interval_ms: default_call_poll_interval(),
            call_poll_max_attempts: default_call_poll_attempts(),
        }
    }
}

fn default_voice_base_url() -> String {
    "https://api.voice.example.com".to_string()
}

fn default_voice_timeout() -> u64 {
    30
}

fn default_call_poll_interval() -> u64 {
    5_000
}

fn default_call_poll_attempts() -> usize {
    120
}

/// Flow engine (workflow orchestration backend) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    /// Base URL of the flow engine. Empty disables the flow path entirely.
    #[serde(default)]
    pub base_url: String,

    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Health probe timeout, in milliseconds. Probes must stay short: they
    /// sit on the dispatch path.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_ms: u64,

    /// Whole-batch execution timeout, in seconds.
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            health_timeout_ms: default_health_timeout(),
            batch_timeout_secs: default_batch_timeout(),
        }
    }
}

fn default_health_timeout() -> u64 {
    2_000
}

fn default_batch_timeout() -> u64 {
    900
}

/// Tier-2 reasoning oracle configuration (direct LLM ranking).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RankerConfig {
    /// Base URL of the messages API.
    #[serde(default = "default_ranker_base_url")]
    pub base_url: String,

    /// API key for the reasoning oracle.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier used for ranking.
    #[serde(default = "default_ranker_model")]
    pub model: String,

    /// Completion token cap per ranking call.
    #[serde(default = "default_ranker_max_tokens")]
    pub max_tokens: u32,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_ranker_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            base_url: default_ranker_base_url(),
            api_key: None,
            model: default_ranker_model(),
            max_tokens: default_ranker_max_tokens(),
            request_timeout_secs: default_ranker_timeout(),
        }
    }
}

fn default_ranker_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ranker_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_ranker_max_tokens() -> u32 {
    1_024
}

fn default_ranker_timeout() -> u64 {
    60
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the authenticated `/v1` routes. `None` disables
    /// auth (development and tests only).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8820
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead-log journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "ringlet.db".to_string()
}
