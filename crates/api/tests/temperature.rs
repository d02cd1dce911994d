//! Integration tests for ingestion, history, aggregation and reset.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_broken_app, build_test_app, delete, get, post_json, post_reading};
use heatload_core::alert::{NotifyFlag, ALERT_SUBJECT};
use serde_json::json;

// ---------------------------------------------------------------------------
// Ingestion and history
// ---------------------------------------------------------------------------

/// Ingestion returns a message and increasing ids.
#[tokio::test]
async fn post_returns_message_and_id() {
    let app = build_test_app().await;

    let response = post_json(
        &app.router,
        "/temperature/",
        json!({ "timestamp": "2024-07-01 10:00:00", "temperature": 21.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Data received");
    let first = json["id"].as_i64().unwrap();

    let second = post_reading(&app.router, "2024-07-01 10:00:30", 22.0).await;
    assert!(second > first);
}

/// History is returned in insertion order, including records the
/// aggregation will later skip.
#[tokio::test]
async fn get_lists_every_reading_in_order() {
    let app = build_test_app().await;
    post_reading(&app.router, "2024-07-01 10:05:00", 30.0).await;
    post_reading(&app.router, "not a timestamp", 25.0).await;
    post_reading(&app.router, "2024-07-01 10:00:00", 20.0).await;

    let response = get(&app.router, "/temperature/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(
        json,
        json!([
            { "timestamp": "2024-07-01 10:05:00", "temperature": 30.0 },
            { "timestamp": "not a timestamp", "temperature": 25.0 },
            { "timestamp": "2024-07-01 10:00:00", "temperature": 20.0 },
        ])
    );
}

/// A body that is not a reading is rejected by the extractor.
#[tokio::test]
async fn post_without_temperature_is_rejected() {
    let app = build_test_app().await;
    let response = post_json(
        &app.router,
        "/temperature/",
        json!({ "timestamp": "2024-07-01 10:00:00" }),
    )
    .await;
    assert!(response.status().is_client_error());

    let json = body_json(get(&app.router, "/temperature/").await).await;
    assert_eq!(json, json!([]));
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accumulative_temperature_on_empty_store_is_zero() {
    let app = build_test_app().await;
    let json = body_json(get(&app.router, "/accumulative_temperature/").await).await;
    assert_eq!(json["accumulative_temperature"], 0.0);
    assert_eq!(json["max_points"], json!([]));
}

/// Window maxima are summed and reported as `[timestamp, value]` pairs.
#[tokio::test]
async fn accumulative_temperature_sums_window_maxima() {
    let app = build_test_app().await;
    post_reading(&app.router, "2024-07-01 10:00:00", 10.0).await;
    post_reading(&app.router, "2024-07-01 10:01:00", 20.0).await;
    post_reading(&app.router, "2024-07-01 10:06:00", 5.0).await;
    post_reading(&app.router, "garbage", 99.0).await;

    let response = get(&app.router, "/accumulative_temperature/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["accumulative_temperature"], 25.0);
    assert_eq!(
        json["max_points"],
        json!([["2024-07-01 10:01:00", 20.0], ["2024-07-01 10:06:00", 5.0]])
    );
    assert_eq!(app.notifier.attempts(), 0);
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

/// Crossing the threshold notifies once, no matter how often it is checked.
#[tokio::test]
async fn crossing_threshold_notifies_once() {
    let app = build_test_app().await;
    post_reading(&app.router, "2024-07-01 10:00:00", 40.0).await;
    post_reading(&app.router, "2024-07-01 11:00:00", 40.0).await;

    for _ in 0..3 {
        let response = get(&app.router, "/accumulative_temperature/").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ALERT_SUBJECT);
    assert!(sent[0].1.contains("80"));
    assert!(app.handle.flag.is_notified().await.unwrap());
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

/// After a reset the history is empty, the sum is zero, and a new crossing
/// produces exactly one more notification.
#[tokio::test]
async fn reset_clears_history_and_rearms_alert() {
    let app = build_test_app().await;
    post_reading(&app.router, "2024-07-01 10:00:00", 60.0).await;
    get(&app.router, "/accumulative_temperature/").await;
    assert_eq!(app.notifier.sent().len(), 1);

    let response = delete(&app.router, "/temperature/reset/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["message"].is_string());

    assert_eq!(body_json(get(&app.router, "/temperature/").await).await, json!([]));
    let json = body_json(get(&app.router, "/accumulative_temperature/").await).await;
    assert_eq!(json["accumulative_temperature"], 0.0);
    assert!(!app.handle.flag.is_notified().await.unwrap());

    post_reading(&app.router, "2024-07-02 10:00:00", 70.0).await;
    get(&app.router, "/accumulative_temperature/").await;
    get(&app.router, "/accumulative_temperature/").await;
    assert_eq!(app.notifier.sent().len(), 2);
}

/// The file backend behaves the same through the HTTP surface.
#[tokio::test]
async fn file_backend_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = heatload_db::JsonFileStore::open(
        dir.path().join("temperature_data.json"),
        dir.path().join("notified.flag"),
    )
    .unwrap();
    let app = common::build_test_app_with(
        heatload_api::storage::StoreHandle::from_file(store),
        common::test_config(),
    );

    let id = post_reading(&app.router, "2024-07-01 10:00:00", 55.0).await;
    assert_eq!(id, 1);
    get(&app.router, "/accumulative_temperature/").await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notified.flag")).unwrap(),
        "1"
    );

    delete(&app.router, "/temperature/reset/").await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notified.flag")).unwrap(),
        "0"
    );
    assert_eq!(body_json(get(&app.router, "/temperature/").await).await, json!([]));
}

// ---------------------------------------------------------------------------
// Storage failures
// ---------------------------------------------------------------------------

/// Storage failures surface as 500 with the error detail.
#[tokio::test]
async fn storage_failure_returns_500_with_detail() {
    let app = build_broken_app();

    let response = post_json(
        &app.router,
        "/temperature/",
        json!({ "timestamp": "2024-07-01 10:00:00", "temperature": 21.5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "STORAGE_ERROR");
    assert!(json["error"].as_str().unwrap().contains("disk full"));

    for uri in ["/temperature/", "/accumulative_temperature/"] {
        let response = get(&app.router, uri).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    let response = delete(&app.router, "/temperature/reset/").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.notifier.attempts(), 0);
}
