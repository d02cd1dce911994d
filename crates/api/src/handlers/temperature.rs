//! Handlers for reading ingestion, history, aggregation and reset.
//!
//! Ingestion stores whatever well-formed JSON it receives: timestamps and
//! ranges are not checked here. Bad records are skipped later by the
//! aggregation policies.

use axum::extract::State;
use axum::Json;
use heatload_core::aggregation::Accumulation;
use heatload_core::reading::Reading;
use heatload_core::types::DbId;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response to a successful ingestion.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: DbId,
}

/// One entry of `GET /temperature/`.
#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub timestamp: String,
    /// `null` when the stored record had no temperature.
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /temperature/
///
/// Append one reading to the store and return its id.
pub async fn create_reading(
    State(state): State<AppState>,
    Json(reading): Json<Reading>,
) -> AppResult<Json<CreatedResponse>> {
    let id = state.store.insert(&reading).await?;
    tracing::info!(id, timestamp = %reading.timestamp, temperature = reading.temperature, "Reading received");
    Ok(Json(CreatedResponse {
        message: "Data received",
        id,
    }))
}

/// GET /temperature/
///
/// Every stored reading in insertion order.
pub async fn list_readings(State(state): State<AppState>) -> AppResult<Json<Vec<ReadingResponse>>> {
    let readings = state.store.list_all().await?;
    Ok(Json(
        readings
            .into_iter()
            .map(|r| ReadingResponse {
                timestamp: r.timestamp,
                temperature: r.temperature,
            })
            .collect(),
    ))
}

/// GET /accumulative_temperature/
///
/// Aggregate the full history and run the threshold check, exactly as the
/// background job does.
pub async fn accumulative_temperature(
    State(state): State<AppState>,
) -> AppResult<Json<Accumulation>> {
    let report = state.accumulation.check().await?;
    Ok(Json(report.accumulation))
}

/// DELETE /temperature/reset/
///
/// Drop all readings and re-arm the alert in one step.
pub async fn reset(State(state): State<AppState>) -> AppResult<Json<MessageResponse>> {
    state.accumulation.reset().await?;
    tracing::info!("Readings and notify flag reset");
    Ok(Json(MessageResponse {
        message: "Temperature data and notification flag reset",
    }))
}
