// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row-mapping helpers for storage entities.
//!
//! The canonical domain types live in `ringlet-core::types`; this module
//! provides the string/enum/timestamp conversions the query modules use when
//! mapping SQLite rows. Enums are stored as their snake_case string form and
//! timestamps as RFC 3339 text.

use std::str::FromStr;

use chrono::{DateTime, Utc};

pub use ringlet_core::types::{
    CallResult, CallStatus, InteractionLogEntry, LifecycleState, ProviderCall, RankedProvider,
    ServiceRequest,
};

/// Parses a stored enum string back into its typed form.
///
/// A value that fails to parse indicates row corruption (or a schema drift),
/// surfaced as a column conversion failure rather than a panic.
pub(crate) fn parse_enum<T: FromStr>(value: String, idx: usize) -> Result<T, rusqlite::Error> {
    value.parse::<T>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(format!(
                "unrecognized enum value `{value}`"
            ))),
        )
    })
}

/// Parses a stored RFC 3339 timestamp.
pub(crate) fn parse_datetime(
    value: String,
    idx: usize,
) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Parses an optional stored RFC 3339 timestamp.
pub(crate) fn parse_opt_datetime(
    value: Option<String>,
    idx: usize,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_datetime(v, idx)).transpose()
}

/// Parses an optional stored JSON column.
pub(crate) fn parse_opt_json<T: serde::de::DeserializeOwned>(
    value: Option<String>,
    idx: usize,
) -> Result<Option<T>, rusqlite::Error> {
    value
        .map(|v| {
            serde_json::from_str(&v).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}
