// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call result reconciliation for the Ringlet call-orchestration service.
//!
//! Three pieces cooperate here:
//! - [`ResultCache`]: a TTL-bounded in-memory store of call result snapshots,
//!   keyed by the voice backend's call id, safe under concurrent access from
//!   the webhook intake and the background fetcher.
//! - [`merge::merge_results`]: the richer-record-wins merge used when the
//!   authoritative record lands on top of a partial webhook snapshot.
//! - [`EnrichmentFetcher`]: a bounded-retry background worker that queries
//!   the voice backend until a record is judged complete, then merges it into
//!   the cache and hands it to durable persistence.

pub mod cache;
pub mod enrich;
pub mod merge;

pub use cache::{CacheStats, ResultCache};
pub use enrich::EnrichmentFetcher;
