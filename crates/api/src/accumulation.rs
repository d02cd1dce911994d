//! One accumulation check: read the full history, aggregate it with the
//! configured policy, and hand the result to the alert gate.
//!
//! Both `GET /accumulative_temperature/` and the background check run this.
//! Each caller owns its [`AccumulationService`] (and therefore its own store
//! handle); they share a single [`AlertGate`] so notification stays
//! at-most-once across them.

use std::sync::Arc;

use heatload_core::aggregation::{Accumulation, AggregationPolicy};
use heatload_core::alert::{AlertGate, AlertOutcome};
use heatload_db::{CollectorStore, StoreError};

pub struct AccumulationService {
    store: Arc<dyn CollectorStore>,
    policy: AggregationPolicy,
    gate: Arc<AlertGate>,
}

/// What a single check produced.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub accumulation: Accumulation,
    pub alert: AlertOutcome,
}

impl AccumulationService {
    pub fn new(
        store: Arc<dyn CollectorStore>,
        policy: AggregationPolicy,
        gate: Arc<AlertGate>,
    ) -> Self {
        Self {
            store,
            policy,
            gate,
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Aggregate the stored history without touching the alert state.
    pub async fn compute(&self) -> Result<Accumulation, StoreError> {
        let readings = self.store.list_all().await?;
        Ok(self.policy.accumulate(&readings))
    }

    /// Aggregate, then run the threshold check on the result.
    ///
    /// The gate is held from the history read to the end of the check, so a
    /// concurrent [`reset`](Self::reset) lands wholly before or after.
    pub async fn check(&self) -> Result<CheckReport, StoreError> {
        let gate = self.gate.lock().await;
        let accumulation = self.compute().await?;
        let alert = gate.check(accumulation.accumulative_temperature).await;
        tracing::debug!(
            accumulative_temperature = accumulation.accumulative_temperature,
            max_points = accumulation.max_points.len(),
            ?alert,
            "Accumulation check complete"
        );
        Ok(CheckReport {
            accumulation,
            alert,
        })
    }

    /// Drop all readings and clear the notify flag.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let _gate = self.gate.lock().await;
        self.store.reset().await
    }
}
