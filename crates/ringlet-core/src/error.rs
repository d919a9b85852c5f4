// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ringlet call-orchestration service.

use thiserror::Error;

/// The primary error type used across all Ringlet backend traits and core operations.
#[derive(Debug, Error)]
pub enum RingletError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range knobs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Voice backend errors (call placement rejected, record fetch failure, API errors).
    #[error("voice backend error: {message}")]
    Voice {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Flow engine errors (batch execution failure, ranking flow failure).
    #[error("flow engine error: {message}")]
    Flow {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A batch dispatch could not be started at all (as opposed to
    /// per-item failures, which are collected in the batch result).
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// The flow engine is configured as required but failed its health probe.
    #[error("flow engine required but unhealthy: {0}")]
    FlowRequired(String),

    /// A lifecycle transition was requested that the state graph does not allow.
    #[error("invalid lifecycle transition for request {request_id}: {from} -> {to}")]
    InvalidTransition {
        request_id: String,
        from: String,
        to: String,
    },

    /// A duplicate trigger arrived while an equivalent advancement was
    /// already in flight (e.g. a second booking-selection signal).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested entity was not found (or has expired from the cache).
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RingletError {
    /// Shorthand for a voice backend error without an underlying source.
    pub fn voice(message: impl Into<String>) -> Self {
        RingletError::Voice {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a flow engine error without an underlying source.
    pub fn flow(message: impl Into<String>) -> Self {
        RingletError::Flow {
            message: message.into(),
            source: None,
        }
    }
}
