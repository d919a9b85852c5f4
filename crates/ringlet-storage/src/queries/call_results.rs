// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable call result operations.
//!
//! Results are upserted: the enrichment fetcher may persist the same call id
//! more than once as its data completeness improves.

use ringlet_core::RingletError;
use ringlet_core::types::CallResult;
use rusqlite::params;

use crate::database::Database;
use crate::models;

fn call_result_from_row(row: &rusqlite::Row<'_>) -> Result<CallResult, rusqlite::Error> {
    Ok(CallResult {
        call_id: row.get(0)?,
        request_id: row.get(1)?,
        provider_name: row.get(2)?,
        phone: row.get(3)?,
        status: models::parse_enum(row.get::<_, String>(4)?, 4)?,
        method: models::parse_enum(row.get::<_, String>(5)?, 5)?,
        duration_secs: row.get(6)?,
        ended_reason: row.get(7)?,
        transcript: row.get(8)?,
        analysis: models::parse_opt_json(row.get::<_, Option<String>>(9)?, 9)?,
        cost: row.get(10)?,
        completeness: models::parse_enum(row.get::<_, String>(11)?, 11)?,
        received_at: models::parse_datetime(row.get::<_, String>(12)?, 12)?,
        enriched_at: models::parse_opt_datetime(row.get::<_, Option<String>>(13)?, 13)?,
    })
}

/// Insert or replace the durable record for a call result.
pub async fn save(db: &Database, result: &CallResult) -> Result<(), RingletError> {
    let result = result.clone();
    db.connection()
        .call(move |conn| {
            let analysis = result
                .analysis
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO call_results (call_id, request_id, provider_name, phone, status, \
                 method, duration_secs, ended_reason, transcript, analysis, cost, completeness, \
                 received_at, enriched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT (call_id) DO UPDATE SET
                     request_id = excluded.request_id,
                     provider_name = excluded.provider_name,
                     phone = excluded.phone,
                     status = excluded.status,
                     method = excluded.method,
                     duration_secs = excluded.duration_secs,
                     ended_reason = excluded.ended_reason,
                     transcript = excluded.transcript,
                     analysis = excluded.analysis,
                     cost = excluded.cost,
                     completeness = excluded.completeness,
                     enriched_at = excluded.enriched_at",
                params![
                    result.call_id,
                    result.request_id,
                    result.provider_name,
                    result.phone,
                    result.status.to_string(),
                    result.method.to_string(),
                    result.duration_secs,
                    result.ended_reason,
                    result.transcript,
                    analysis,
                    result.cost,
                    result.completeness.to_string(),
                    result.received_at.to_rfc3339(),
                    result.enriched_at.map(|dt| dt.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the durable record for a call id.
pub async fn get(db: &Database, call_id: &str) -> Result<Option<CallResult>, RingletError> {
    let call_id = call_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT call_id, request_id, provider_name, phone, status, method, \
                 duration_secs, ended_reason, transcript, analysis, cost, completeness, \
                 received_at, enriched_at
                 FROM call_results WHERE call_id = ?1",
            )?;
            let result = stmt.query_row(params![call_id], call_result_from_row);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
