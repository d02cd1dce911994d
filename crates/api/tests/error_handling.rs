//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly; no router is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use heatload_api::error::AppError;
use heatload_db::StoreError;
use http_body_util::BodyExt;

/// Convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn store_error_returns_500_with_detail() {
    let err = AppError::Store(StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "read-only file system",
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "STORAGE_ERROR");
    assert_eq!(json["error"], "Storage I/O error: read-only file system");
}

#[tokio::test]
async fn corrupt_store_returns_500_with_detail() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{ truncated").unwrap_err();
    let err = AppError::from(StoreError::Json(parse_err));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "STORAGE_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Stored data is not valid JSON"));
}
