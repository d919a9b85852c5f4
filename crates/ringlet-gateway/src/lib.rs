// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Ringlet call-orchestration service.
//!
//! Exposes the external interfaces: completion-notification intake, result
//! lookup and cache administration, batch dispatch (sync and async), service
//! request creation, status polling, selection intake, and the interaction
//! log, behind optional bearer-token auth.

pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, build_router, start_server};
