use std::sync::Arc;

use heatload_db::CollectorStore;

use crate::accumulation::AccumulationService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Reading history used by request handlers.
    pub store: Arc<dyn CollectorStore>,
    /// Aggregation plus alert check over `store`.
    pub accumulation: Arc<AccumulationService>,
    pub config: Arc<ServerConfig>,
}
