//! Storage abstraction for the collector.
//!
//! Handlers, the background check, and the import tool talk to a
//! [`CollectorStore`]; the aggregation policies consume whatever
//! [`CollectorStore::list_all`] returns, so backends are swappable without
//! touching aggregation.

use async_trait::async_trait;
use heatload_core::alert::NotifyFlag;
use heatload_core::reading::{Reading, StoredReading};
use heatload_core::types::{BoxError, DbId};

use crate::error::StoreError;
use crate::repositories::{NotifyStateRepo, TemperatureRepo};
use crate::DbPool;

/// Durable, append-only record of accepted readings.
#[async_trait]
pub trait CollectorStore: Send + Sync {
    /// Append a reading and return its generated id. No validation.
    async fn insert(&self, reading: &Reading) -> Result<DbId, StoreError>;

    /// Append many readings all-or-nothing. Returns how many were written.
    async fn insert_batch(&self, readings: &[Reading]) -> Result<u64, StoreError>;

    /// Every stored reading, in insertion order.
    async fn list_all(&self) -> Result<Vec<StoredReading>, StoreError>;

    /// Delete every reading and clear the notify flag as one operation.
    async fn reset(&self) -> Result<(), StoreError>;
}

/// SQLite-backed store. Cheap to clone (wraps the pool).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CollectorStore for SqliteStore {
    async fn insert(&self, reading: &Reading) -> Result<DbId, StoreError> {
        let id = TemperatureRepo::insert(&self.pool, reading).await?;
        tracing::debug!(id, timestamp = %reading.timestamp, "Reading stored");
        Ok(id)
    }

    async fn insert_batch(&self, readings: &[Reading]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for reading in readings {
            TemperatureRepo::insert(&mut *tx, reading).await?;
        }
        tx.commit().await?;
        Ok(readings.len() as u64)
    }

    async fn list_all(&self) -> Result<Vec<StoredReading>, StoreError> {
        let rows = TemperatureRepo::list_all(&self.pool).await?;
        Ok(rows.into_iter().map(StoredReading::from).collect())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = TemperatureRepo::delete_all(&mut *tx).await?;
        NotifyStateRepo::set(&mut *tx, false).await?;
        tx.commit().await?;
        tracing::info!(deleted, "Collector store reset");
        Ok(())
    }
}

#[async_trait]
impl NotifyFlag for SqliteStore {
    async fn is_notified(&self) -> Result<bool, BoxError> {
        Ok(NotifyStateRepo::get(&self.pool).await?)
    }

    async fn set_notified(&self) -> Result<(), BoxError> {
        NotifyStateRepo::set(&self.pool, true).await?;
        Ok(())
    }
}
