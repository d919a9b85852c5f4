// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod call_results;
pub mod interaction_log;
pub mod provider_calls;
pub mod service_requests;
