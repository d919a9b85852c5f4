// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the Storage trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ringlet_config::model::StorageConfig;
use ringlet_core::types::{
    CallResult, CallStatus, HealthStatus, InteractionLogEntry, LifecycleState, ProviderCall,
    RankedProvider, ServiceRequest,
};
use ringlet_core::{BackendAdapter, RingletError, Storage};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`Storage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`Storage::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, RingletError> {
        self.db.get().ok_or_else(|| RingletError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl BackendAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, RingletError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RingletError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<(), RingletError> {
        self.db
            .get_or_try_init(|| Database::open(&self.config.database_path, self.config.wal_mode))
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), RingletError> {
        self.shutdown().await
    }

    async fn create_service_request(&self, request: &ServiceRequest) -> Result<(), RingletError> {
        queries::service_requests::create(self.db()?, request).await
    }

    async fn get_service_request(
        &self,
        id: &str,
    ) -> Result<Option<ServiceRequest>, RingletError> {
        queries::service_requests::get(self.db()?, id).await
    }

    async fn update_request_state(
        &self,
        id: &str,
        state: LifecycleState,
        outcome: Option<&str>,
    ) -> Result<(), RingletError> {
        queries::service_requests::update_state(self.db()?, id, state, outcome).await
    }

    async fn save_recommendations(
        &self,
        id: &str,
        recommendations: &[RankedProvider],
    ) -> Result<(), RingletError> {
        queries::service_requests::save_recommendations(self.db()?, id, recommendations).await
    }

    async fn save_selection(&self, id: &str, provider_name: &str) -> Result<(), RingletError> {
        queries::service_requests::save_selection(self.db()?, id, provider_name).await
    }

    async fn save_appointment(
        &self,
        id: &str,
        provider_name: &str,
        date: Option<&str>,
        time: Option<&str>,
    ) -> Result<(), RingletError> {
        queries::service_requests::save_appointment(self.db()?, id, provider_name, date, time)
            .await
    }

    async fn upsert_provider_call(&self, call: &ProviderCall) -> Result<(), RingletError> {
        queries::provider_calls::upsert(self.db()?, call).await
    }

    async fn update_provider_call_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> Result<(), RingletError> {
        queries::provider_calls::update_status_by_call_id(self.db()?, call_id, status).await
    }

    async fn list_provider_calls(
        &self,
        request_id: &str,
    ) -> Result<Vec<ProviderCall>, RingletError> {
        queries::provider_calls::list_for_request(self.db()?, request_id).await
    }

    async fn save_call_result(&self, result: &CallResult) -> Result<(), RingletError> {
        queries::call_results::save(self.db()?, result).await
    }

    async fn get_call_result(&self, call_id: &str) -> Result<Option<CallResult>, RingletError> {
        queries::call_results::get(self.db()?, call_id).await
    }

    async fn append_log(&self, entry: &InteractionLogEntry) -> Result<(), RingletError> {
        queries::interaction_log::append(self.db()?, entry).await
    }

    async fn list_log(
        &self,
        request_id: &str,
    ) -> Result<Vec<InteractionLogEntry>, RingletError> {
        queries::interaction_log::list_for_request(self.db()?, request_id).await
    }
}
