// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-provider call status operations.
//!
//! These rows back the live-progress status endpoint and the calling-gate
//! poll: the dispatcher writes `queued` rows up front, then the webhook
//! intake and the dispatch loop advance each row's status.

use chrono::Utc;
use ringlet_core::RingletError;
use ringlet_core::types::{CallStatus, ProviderCall};
use rusqlite::params;

use crate::database::Database;
use crate::models;

fn provider_call_from_row(row: &rusqlite::Row<'_>) -> Result<ProviderCall, rusqlite::Error> {
    Ok(ProviderCall {
        request_id: row.get(0)?,
        provider_name: row.get(1)?,
        phone: row.get(2)?,
        provider_id: row.get(3)?,
        call_id: row.get(4)?,
        status: models::parse_enum(row.get::<_, String>(5)?, 5)?,
        dispatched_at: models::parse_datetime(row.get::<_, String>(6)?, 6)?,
        updated_at: models::parse_datetime(row.get::<_, String>(7)?, 7)?,
    })
}

/// Insert or replace the status row for `(request_id, phone)`.
pub async fn upsert(db: &Database, call: &ProviderCall) -> Result<(), RingletError> {
    let call = call.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO provider_calls (request_id, provider_name, phone, provider_id, \
                 call_id, status, dispatched_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (request_id, phone) DO UPDATE SET
                     provider_name = excluded.provider_name,
                     provider_id = excluded.provider_id,
                     call_id = COALESCE(excluded.call_id, provider_calls.call_id),
                     status = excluded.status,
                     updated_at = excluded.updated_at",
                params![
                    call.request_id,
                    call.provider_name,
                    call.phone,
                    call.provider_id,
                    call.call_id,
                    call.status.to_string(),
                    call.dispatched_at.to_rfc3339(),
                    call.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update the status of the row matching a backend call id.
///
/// Unknown call ids are a no-op: webhook events can arrive for calls this
/// process never dispatched (e.g. after a restart mid-batch).
pub async fn update_status_by_call_id(
    db: &Database,
    call_id: &str,
    status: CallStatus,
) -> Result<(), RingletError> {
    let call_id = call_id.to_string();
    let status = status.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE provider_calls SET status = ?2, updated_at = ?3 WHERE call_id = ?1",
                params![call_id, status, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all provider call rows for a service request, oldest first.
pub async fn list_for_request(
    db: &Database,
    request_id: &str,
) -> Result<Vec<ProviderCall>, RingletError> {
    let request_id = request_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, provider_name, phone, provider_id, call_id, status, \
                 dispatched_at, updated_at
                 FROM provider_calls WHERE request_id = ?1 ORDER BY dispatched_at ASC",
            )?;
            let rows = stmt.query_map(params![request_id], provider_call_from_row)?;
            let mut calls = Vec::new();
            for row in rows {
                calls.push(row?);
            }
            Ok(calls)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
