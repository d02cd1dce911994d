//! Route definitions for reading ingestion and aggregation.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::temperature;
use crate::state::AppState;

/// ```text
/// POST   /temperature/               -> create_reading
/// GET    /temperature/               -> list_readings
/// DELETE /temperature/reset/         -> reset
/// GET    /accumulative_temperature/  -> accumulative_temperature
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/temperature/",
            get(temperature::list_readings).post(temperature::create_reading),
        )
        .route("/temperature/reset/", delete(temperature::reset))
        .route(
            "/accumulative_temperature/",
            get(temperature::accumulative_temperature),
        )
}
