// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Ringlet workspace: mock execution backend, mock
//! oracles, and a full-stack test harness on temp SQLite.

pub mod harness;
pub mod mock_backend;
pub mod mock_oracles;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_backend::{MockCallBackend, ScriptedOutcome};
pub use mock_oracles::{MockNotifier, MockRanker};
