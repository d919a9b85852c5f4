// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as bounded numeric knobs and cross-field requirements.
//! Collects all errors instead of failing fast.

use crate::diagnostic::ConfigError;
use crate::model::RingletConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// every collected validation error.
pub fn validate_config(config: &RingletConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must be non-zero".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.dispatch.max_concurrent < 1 || config.dispatch.max_concurrent > 10 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.max_concurrent must be in [1, 10], got {}",
                config.dispatch.max_concurrent
            ),
        });
    }

    if config.dispatch.test_mode && config.dispatch.test_number_pool().is_empty() {
        errors.push(ConfigError::Validation {
            message: "dispatch.test_mode requires a non-empty dispatch.test_numbers pool"
                .to_string(),
        });
    }

    if config.dispatch.strict_flow && config.flow.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "dispatch.strict_flow requires flow.base_url to be set".to_string(),
        });
    }

    if config.enrichment.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "enrichment.max_attempts must be at least 1".to_string(),
        });
    }

    if config.enrichment.delays_ms.is_empty() {
        errors.push(ConfigError::Validation {
            message: "enrichment.delays_ms must not be empty".to_string(),
        });
    }

    if config.lifecycle.poll_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "lifecycle.poll_max_attempts must be at least 1".to_string(),
        });
    }

    if config.lifecycle.booking_poll_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "lifecycle.booking_poll_max_attempts must be at least 1".to_string(),
        });
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "cache.ttl_secs must be at least 1".to_string(),
        });
    }

    if config.voice.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "voice.base_url must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
