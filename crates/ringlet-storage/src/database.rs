// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use ringlet_core::RingletError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Opening the database configures pragmas and runs all pending migrations.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path` and prepares it.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, RingletError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_rq_err)?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5_000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Funnels tokio-rusqlite errors into the workspace error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> RingletError {
    RingletError::Storage {
        source: Box::new(err),
    }
}

/// Funnels raw rusqlite errors into the workspace error type.
pub fn map_rq_err(err: rusqlite::Error) -> RingletError {
    RingletError::Storage {
        source: Box::new(err),
    }
}
