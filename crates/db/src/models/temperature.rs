//! Row type for the `temperatures` table.

use heatload_core::reading::StoredReading;
use heatload_core::types::DbId;
use sqlx::FromRow;

/// A row of `temperatures`.
#[derive(Debug, Clone, FromRow)]
pub struct TemperatureRow {
    pub id: DbId,
    pub timestamp: String,
    pub temperature: Option<f64>,
}

impl From<TemperatureRow> for StoredReading {
    fn from(row: TemperatureRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            temperature: row.temperature,
        }
    }
}
