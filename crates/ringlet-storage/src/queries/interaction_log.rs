// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only interaction log operations.
//!
//! There is no update or delete here on purpose: the log is an audit trail.

use ringlet_core::RingletError;
use ringlet_core::types::InteractionLogEntry;
use rusqlite::params;

use crate::database::Database;
use crate::models;

/// Append an audit entry.
pub async fn append(db: &Database, entry: &InteractionLogEntry) -> Result<(), RingletError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO interaction_log (request_id, step, detail, status, call_id, \
                 created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.request_id,
                    entry.step,
                    entry.detail,
                    entry.status.to_string(),
                    entry.call_id,
                    entry.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all entries for a service request in append order.
pub async fn list_for_request(
    db: &Database,
    request_id: &str,
) -> Result<Vec<InteractionLogEntry>, RingletError> {
    let request_id = request_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, step, detail, status, call_id, created_at
                 FROM interaction_log WHERE request_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![request_id], |row| {
                Ok(InteractionLogEntry {
                    request_id: row.get(0)?,
                    step: row.get(1)?,
                    detail: row.get(2)?,
                    status: models::parse_enum(row.get::<_, String>(3)?, 3)?,
                    call_id: row.get(4)?,
                    created_at: models::parse_datetime(row.get::<_, String>(5)?, 5)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
