// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Ringlet's pluggable seams.

pub mod adapter;
pub mod execution;
pub mod notify;
pub mod ranking;
pub mod storage;

pub use adapter::BackendAdapter;
pub use execution::{CallRecordSource, ExecutionBackend};
pub use notify::Notifier;
pub use ranking::RankingOracle;
pub use storage::Storage;
