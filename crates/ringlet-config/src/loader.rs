// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ringlet.toml` > `~/.config/ringlet/ringlet.toml`
//! > `/etc/ringlet/ringlet.toml` with environment variable overrides via the
//! `RINGLET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RingletConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ringlet/ringlet.toml` (system-wide)
/// 3. `~/.config/ringlet/ringlet.toml` (user XDG config)
/// 4. `./ringlet.toml` (local directory)
/// 5. `RINGLET_*` environment variables
pub fn load_config() -> Result<RingletConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RingletConfig::default()))
        .merge(Toml::file("/etc/ringlet/ringlet.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ringlet/ringlet.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ringlet.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RingletConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RingletConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RingletConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RingletConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `RINGLET_DISPATCH_MAX_CONCURRENT`
/// must map to `dispatch.max_concurrent`, not `dispatch.max.concurrent`.
fn env_provider() -> Env {
    Env::prefixed("RINGLET_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: RINGLET_DISPATCH_MAX_CONCURRENT -> "dispatch_max_concurrent"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("enrichment_", "enrichment.", 1)
            .replacen("cache_", "cache.", 1)
            .replacen("lifecycle_", "lifecycle.", 1)
            .replacen("voice_", "voice.", 1)
            .replacen("flow_", "flow.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}
