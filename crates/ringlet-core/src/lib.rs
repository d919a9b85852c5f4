// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ringlet call-orchestration service.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Ringlet workspace. Backend adapters
//! (voice, flow engine, storage) implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RingletError;
pub use types::{
    BatchOptions, BatchResult, CallAnalysis, CallRequest, CallResult, CallStatus, DispatchError,
    DispatchMethod, FetchStatus, HealthStatus, InteractionLogEntry, LifecycleState, LogStatus,
    ProviderCall, RankedProvider, ServiceRequest, Urgency,
};

pub use traits::{
    BackendAdapter, CallRecordSource, ExecutionBackend, Notifier, RankingOracle, Storage,
};
