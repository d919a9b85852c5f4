// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request lifecycle orchestration for the Ringlet call-orchestration service.
//!
//! The [`LifecycleRunner`] drives each service request through the fixed
//! state graph, gating the calling phase on persisted per-provider statuses,
//! ranking completed calls through a two-tier oracle, and running the
//! booking flow through the confirmation heuristic.

pub mod heuristic;
pub mod notify;
pub mod ranking;
pub mod runner;

pub use heuristic::{BookingInference, infer_confirmation};
pub use notify::LogNotifier;
pub use ranking::{ModelRanker, TieredRanker};
pub use runner::{LifecycleRunner, ProviderSelection};
