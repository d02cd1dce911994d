//! Periodic accumulation and threshold check.
//!
//! Runs the same computation as `GET /accumulative_temperature/` on a fixed
//! interval, independent of request traffic. The first check runs
//! immediately at startup. Its only side effects are the notify flag and the
//! notifier.

use std::sync::Arc;
use std::time::Duration;

use heatload_core::alert::AlertOutcome;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::accumulation::AccumulationService;

/// Run the check loop until `cancel` is triggered.
///
/// A failing check is logged and retried on the next tick.
pub async fn run(service: Arc<AccumulationService>, period: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = period.as_secs(),
        policy = ?service.policy(),
        "Accumulation check job started"
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Accumulation check job stopping");
                break;
            }
            _ = interval.tick() => {
                match service.check().await {
                    Ok(report) => match report.alert {
                        AlertOutcome::Notified => {
                            tracing::info!(
                                accumulative_temperature = report.accumulation.accumulative_temperature,
                                "Accumulation check: alert sent"
                            );
                        }
                        outcome => {
                            tracing::debug!(
                                accumulative_temperature = report.accumulation.accumulative_temperature,
                                ?outcome,
                                "Accumulation check: no alert sent"
                            );
                        }
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Accumulation check failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use heatload_core::aggregation::AggregationPolicy;
    use heatload_core::alert::{AlertGate, InMemoryNotifyFlag, RecordingNotifier};
    use heatload_core::reading::Reading;
    use heatload_db::{CollectorStore, JsonFileStore};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_runs_immediately_and_cancel_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data.json"), dir.path().join("flag"))
            .unwrap();
        store
            .insert(&Reading {
                timestamp: "2024-07-01 10:00:00".into(),
                temperature: 90.0,
            })
            .await
            .unwrap();

        let notifier = Arc::new(RecordingNotifier::new());
        let gate = Arc::new(AlertGate::new(
            50.0,
            Arc::new(InMemoryNotifyFlag::default()),
            notifier.clone(),
        ));
        let service = Arc::new(AccumulationService::new(
            Arc::new(store),
            AggregationPolicy::default(),
            gate,
        ));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(service, Duration::from_secs(300), cancel.clone()));

        // Let the immediate first tick complete, then a few more periods.
        tokio::time::sleep(Duration::from_secs(901)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(notifier.attempts(), 1);
    }
}
