//! Tests for the accumulation check racing an administrative reset.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use heatload_api::accumulation::AccumulationService;
use heatload_api::storage::StoreHandle;
use heatload_core::aggregation::AggregationPolicy;
use heatload_core::alert::{AlertGate, AlertOutcome, NotifyFlag, RecordingNotifier};
use heatload_core::reading::{Reading, StoredReading};
use heatload_core::types::DbId;
use heatload_db::{CollectorStore, SqliteStore, StoreError};
use tokio::sync::Notify;

/// Signals after every history read, then stalls long enough for a
/// concurrent reset to run if nothing holds it off.
struct SlowListStore {
    inner: Arc<dyn CollectorStore>,
    listed: Arc<Notify>,
}

#[async_trait]
impl CollectorStore for SlowListStore {
    async fn insert(&self, reading: &Reading) -> Result<DbId, StoreError> {
        self.inner.insert(reading).await
    }

    async fn insert_batch(&self, readings: &[Reading]) -> Result<u64, StoreError> {
        self.inner.insert_batch(readings).await
    }

    async fn list_all(&self) -> Result<Vec<StoredReading>, StoreError> {
        let readings = self.inner.list_all().await?;
        self.listed.notify_one();
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(readings)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.inner.reset().await
    }
}

fn reading(timestamp: &str, temperature: f64) -> Reading {
    Reading {
        timestamp: timestamp.to_string(),
        temperature,
    }
}

// ---------------------------------------------------------------------------
// Test: a reset issued mid-check still re-arms the alert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_during_check_leaves_alert_armed() {
    let pool = heatload_db::create_pool("sqlite::memory:").await.unwrap();
    heatload_db::run_migrations(&pool).await.unwrap();
    let handle = StoreHandle::from_sqlite(SqliteStore::new(pool));

    let listed = Arc::new(Notify::new());
    let store: Arc<dyn CollectorStore> = Arc::new(SlowListStore {
        inner: Arc::clone(&handle.store),
        listed: Arc::clone(&listed),
    });
    let notifier = Arc::new(RecordingNotifier::new());
    let gate = Arc::new(AlertGate::new(50.0, Arc::clone(&handle.flag), notifier.clone()));
    let service = Arc::new(AccumulationService::new(
        Arc::clone(&store),
        AggregationPolicy::default(),
        gate,
    ));

    store.insert(&reading("2024-07-01 10:00:00", 90.0)).await.unwrap();

    let check = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.check().await }
    });
    listed.notified().await;
    let reset = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.reset().await }
    });

    let report = check.await.unwrap().unwrap();
    reset.await.unwrap().unwrap();

    // The check ran on the pre-reset history; the reset came after it.
    assert_eq!(report.alert, AlertOutcome::Notified);
    assert!(store.list_all().await.unwrap().is_empty());
    assert!(!handle.flag.is_notified().await.unwrap());

    // A fresh crossing after the reset gets its own notification.
    store.insert(&reading("2024-07-02 10:00:00", 90.0)).await.unwrap();
    let report = service.check().await.unwrap();
    assert_eq!(report.alert, AlertOutcome::Notified);
    assert_eq!(notifier.sent().len(), 2);
}
