//! Repository for the `temperatures` table (append-only).

use heatload_core::reading::Reading;
use heatload_core::types::DbId;
use sqlx::SqliteExecutor;

use crate::models::temperature::TemperatureRow;

/// Column list for `temperatures` SELECT queries.
const COLUMNS: &str = "id, timestamp, temperature";

/// Provides query operations for stored readings.
pub struct TemperatureRepo;

impl TemperatureRepo {
    /// Append a reading and return its generated id.
    pub async fn insert<'e, E>(executor: E, reading: &Reading) -> Result<DbId, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO temperatures (timestamp, temperature) VALUES (?, ?) RETURNING id",
        )
        .bind(&reading.timestamp)
        .bind(reading.temperature)
        .fetch_one(executor)
        .await
    }

    /// Every stored reading in insertion order.
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<TemperatureRow>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM temperatures ORDER BY id ASC");
        sqlx::query_as::<_, TemperatureRow>(&query)
            .fetch_all(executor)
            .await
    }

    /// Delete every reading. Returns the number of rows removed.
    pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM temperatures")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
