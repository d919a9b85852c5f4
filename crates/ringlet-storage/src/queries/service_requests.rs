// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service request CRUD operations.

use chrono::Utc;
use ringlet_core::RingletError;
use ringlet_core::types::{LifecycleState, RankedProvider, ServiceRequest};
use rusqlite::params;

use crate::database::Database;
use crate::models;

const COLUMNS: &str = "id, service_type, description, urgency, address, state, \
     selected_provider, recommendations, outcome, appointment_date, appointment_time, \
     created_at, updated_at";

fn request_from_row(row: &rusqlite::Row<'_>) -> Result<ServiceRequest, rusqlite::Error> {
    Ok(ServiceRequest {
        id: row.get(0)?,
        service_type: row.get(1)?,
        description: row.get(2)?,
        urgency: models::parse_enum(row.get::<_, String>(3)?, 3)?,
        address: row.get(4)?,
        state: models::parse_enum(row.get::<_, String>(5)?, 5)?,
        selected_provider: row.get(6)?,
        recommendations: models::parse_opt_json(row.get::<_, Option<String>>(7)?, 7)?,
        outcome: row.get(8)?,
        appointment_date: row.get(9)?,
        appointment_time: row.get(10)?,
        created_at: models::parse_datetime(row.get::<_, String>(11)?, 11)?,
        updated_at: models::parse_datetime(row.get::<_, String>(12)?, 12)?,
    })
}

/// Create a new service request.
pub async fn create(db: &Database, request: &ServiceRequest) -> Result<(), RingletError> {
    let request = request.clone();
    db.connection()
        .call(move |conn| {
            let recommendations = request
                .recommendations
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO service_requests (id, service_type, description, urgency, address, \
                 state, selected_provider, recommendations, outcome, appointment_date, \
                 appointment_time, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    request.id,
                    request.service_type,
                    request.description,
                    request.urgency.to_string(),
                    request.address,
                    request.state.to_string(),
                    request.selected_provider,
                    recommendations,
                    request.outcome,
                    request.appointment_date,
                    request.appointment_time,
                    request.created_at.to_rfc3339(),
                    request.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a service request by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<ServiceRequest>, RingletError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM service_requests WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], request_from_row);
            match result {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist a lifecycle transition. The outcome column is only written when
/// `outcome` is `Some`, so a later transition never clears a recorded cause.
pub async fn update_state(
    db: &Database,
    id: &str,
    state: LifecycleState,
    outcome: Option<&str>,
) -> Result<(), RingletError> {
    let id = id.to_string();
    let state = state.to_string();
    let outcome = outcome.map(str::to_string);
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let updated = match outcome {
                Some(outcome) => conn.execute(
                    "UPDATE service_requests SET state = ?2, outcome = ?3, updated_at = ?4 \
                     WHERE id = ?1",
                    params![id, state, outcome, now],
                )?,
                None => conn.execute(
                    "UPDATE service_requests SET state = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, state, now],
                )?,
            };
            if updated == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the recommendation set produced by the ranking oracle.
pub async fn save_recommendations(
    db: &Database,
    id: &str,
    recommendations: &[RankedProvider],
) -> Result<(), RingletError> {
    let id = id.to_string();
    let json = serde_json::to_string(recommendations).map_err(|e| RingletError::Storage {
        source: Box::new(e),
    })?;
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE service_requests SET recommendations = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, json, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the user's provider selection.
pub async fn save_selection(
    db: &Database,
    id: &str,
    provider_name: &str,
) -> Result<(), RingletError> {
    let id = id.to_string();
    let provider_name = provider_name.to_string();
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE service_requests SET selected_provider = ?2, updated_at = ?3 \
                 WHERE id = ?1",
                params![id, provider_name, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist confirmed appointment fields after a successful booking.
pub async fn save_appointment(
    db: &Database,
    id: &str,
    provider_name: &str,
    date: Option<&str>,
    time: Option<&str>,
) -> Result<(), RingletError> {
    let id = id.to_string();
    let provider_name = provider_name.to_string();
    let date = date.map(str::to_string);
    let time = time.map(str::to_string);
    let now = Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE service_requests SET selected_provider = ?2, appointment_date = ?3, \
                 appointment_time = ?4, updated_at = ?5 WHERE id = ?1",
                params![id, provider_name, date, time, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
