#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use heatload_core::aggregation::AggregationPolicy;
use heatload_core::alert::{AlertGate, InMemoryNotifyFlag, RecordingNotifier};
use heatload_core::reading::{Reading, StoredReading};
use heatload_core::types::DbId;
use heatload_db::{CollectorStore, SqliteStore, StoreError};
use http_body_util::BodyExt;
use tower::ServiceExt;

use heatload_api::accumulation::AccumulationService;
use heatload_api::config::{ServerConfig, StorageBackend};
use heatload_api::router::build_app_router;
use heatload_api::state::AppState;
use heatload_api::storage::StoreHandle;

/// Threshold used by the test apps; small enough to cross with a few readings.
pub const TEST_THRESHOLD: f64 = 50.0;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        storage: StorageBackend::Sqlite {
            database_url: "sqlite::memory:".to_string(),
        },
        policy: AggregationPolicy::default(),
        alert_threshold: TEST_THRESHOLD,
        check_interval: Duration::from_secs(300),
    }
}

/// A router plus handles on what it writes to.
pub struct TestApp {
    pub router: Router,
    pub handle: StoreHandle,
    pub notifier: Arc<RecordingNotifier>,
}

/// Full application over a fresh in-memory SQLite store.
pub async fn build_test_app() -> TestApp {
    let pool = heatload_db::create_pool("sqlite::memory:").await.unwrap();
    heatload_db::run_migrations(&pool).await.unwrap();
    build_test_app_with(StoreHandle::from_sqlite(SqliteStore::new(pool)), test_config())
}

/// Full application over `handle`, with a recording notifier.
pub fn build_test_app_with(handle: StoreHandle, config: ServerConfig) -> TestApp {
    let notifier = Arc::new(RecordingNotifier::new());
    let gate = Arc::new(AlertGate::new(
        config.alert_threshold,
        Arc::clone(&handle.flag),
        notifier.clone(),
    ));
    let state = AppState {
        store: Arc::clone(&handle.store),
        accumulation: Arc::new(AccumulationService::new(
            Arc::clone(&handle.store),
            config.policy,
            gate,
        )),
        config: Arc::new(config.clone()),
    };
    let router = build_app_router(state, &config).unwrap();
    TestApp {
        router,
        handle,
        notifier,
    }
}

/// Application whose store fails every operation.
pub fn build_broken_app() -> TestApp {
    let store = Arc::new(BrokenStore);
    let handle = StoreHandle {
        store,
        flag: Arc::new(InMemoryNotifyFlag::default()),
    };
    build_test_app_with(handle, test_config())
}

struct BrokenStore;

fn disk_full() -> StoreError {
    StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "disk full",
    ))
}

#[async_trait]
impl CollectorStore for BrokenStore {
    async fn insert(&self, _reading: &Reading) -> Result<DbId, StoreError> {
        Err(disk_full())
    }

    async fn insert_batch(&self, _readings: &[Reading]) -> Result<u64, StoreError> {
        Err(disk_full())
    }

    async fn list_all(&self) -> Result<Vec<StoredReading>, StoreError> {
        Err(disk_full())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        Err(disk_full())
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Body::from(body.to_string())).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// POST one reading and return the generated id.
pub async fn post_reading(app: &Router, timestamp: &str, temperature: f64) -> i64 {
    let response = post_json(
        app,
        "/temperature/",
        serde_json::json!({ "timestamp": timestamp, "temperature": temperature }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await["id"].as_i64().unwrap()
}
