// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call dispatch for the Ringlet call-orchestration service.
//!
//! [`BackendStrategy`] chooses between the flow engine and the direct voice
//! path based on a short health probe (with an optional strict mode that
//! forbids silent fallback); [`CallDispatcher`] submits bounded-concurrency
//! batches through the chosen backend, records per-provider progress in
//! durable storage, and offers a non-blocking accepted-ticket variant.

pub mod dispatcher;
pub mod strategy;

pub use dispatcher::{CallDispatcher, DispatchTicket};
pub use strategy::BackendStrategy;
