//! Store-and-forward loop.
//!
//! Each tick samples one reading and walks it through:
//!
//! ```text
//! sample -> validate -> probe -> drain pending -> send current -> sleep
//! ```
//!
//! Nothing in a tick is fatal. A reading that passed validation is either
//! acknowledged by the collector or written to the [`PendingQueue`]; if the
//! queue itself cannot be written, the reading is held in memory and the
//! write is retried on the next tick.

use std::time::Duration;

use heatload_core::reading::Reading;

use crate::probe::ConnectivityProbe;
use crate::queue::PendingQueue;
use crate::sender::Delivery;
use crate::sensor::ReadingSource;

/// Default time between samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The sensor could not be read; nothing was queued.
    SensorError,
    /// The value was outside the plausible range and was discarded.
    Rejected { temperature: f64 },
    /// No connectivity; the reading was queued.
    Offline,
    /// The reading was acknowledged. `drained` earlier readings went with it.
    Sent { drained: usize, pending: usize },
    /// The reading could not be delivered and was queued.
    Queued { drained: usize, pending: usize },
}

pub struct Transmitter<S, P, D> {
    source: S,
    probe: P,
    delivery: D,
    queue: PendingQueue,
    /// Validated readings whose queue write failed, oldest first.
    unpersisted: Vec<Reading>,
}

impl<S, P, D> Transmitter<S, P, D>
where
    S: ReadingSource,
    P: ConnectivityProbe,
    D: Delivery,
{
    pub fn new(source: S, probe: P, delivery: D, queue: PendingQueue) -> Self {
        Self {
            source,
            probe,
            delivery,
            queue,
            unpersisted: Vec::new(),
        }
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// Readings accepted but not yet written to the queue file.
    pub fn unpersisted(&self) -> &[Reading] {
        &self.unpersisted
    }

    /// Sample and relay forever, sleeping `interval` between ticks.
    pub async fn run(mut self, interval: Duration) {
        tracing::info!(
            queue_file = %self.queue.path().display(),
            interval_secs = interval.as_secs(),
            "Starting temperature monitoring and transmission"
        );
        loop {
            let outcome = self.tick().await;
            tracing::debug!(?outcome, "Tick complete");
            tokio::time::sleep(interval).await;
        }
    }

    /// Run one sampling tick.
    pub async fn tick(&mut self) -> TickOutcome {
        let temperature = match self.source.read_celsius() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Sensor read failed, skipping tick");
                return TickOutcome::SensorError;
            }
        };

        let reading = Reading::now(temperature);
        if let Err(e) = reading.validate() {
            tracing::warn!(error = %e, "Invalid temperature detected, discarding");
            return TickOutcome::Rejected { temperature };
        }

        if !self.probe.is_reachable().await {
            tracing::warn!(
                timestamp = %reading.timestamp,
                "No connectivity, saving reading locally"
            );
            self.persist(vec![reading]);
            return TickOutcome::Offline;
        }

        let drained = self.drain_pending().await;

        match self.delivery.deliver(&reading).await {
            Ok(()) => {
                tracing::info!(
                    timestamp = %reading.timestamp,
                    temperature = reading.temperature,
                    "Reading delivered"
                );
                TickOutcome::Sent {
                    drained,
                    pending: self.pending_count(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, timestamp = %reading.timestamp, "Delivery failed, queueing reading");
                self.persist(vec![reading]);
                TickOutcome::Queued {
                    drained,
                    pending: self.pending_count(),
                }
            }
        }
    }

    /// Try every queued reading once and keep only the failures.
    ///
    /// Deliveries are attempted first and the survivors written back in a
    /// single replace, so the queue is never edited while being walked.
    /// Returns how many readings were delivered.
    async fn drain_pending(&mut self) -> usize {
        let held = std::mem::take(&mut self.unpersisted);

        let loaded = match self.queue.load_all() {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(error = %e, "Could not load pending queue, skipping its contents");
                let total = held.len();
                let kept = self.deliver_each(held).await;
                let delivered = total - kept.len();
                self.persist(kept);
                return delivered;
            }
        };

        let total = loaded.len() + held.len();
        if total == 0 {
            return 0;
        }

        let mut kept = self.deliver_each(loaded).await;
        let kept_from_file = kept.len();
        kept.extend(self.deliver_each(held).await);
        let delivered = total - kept.len();

        if let Err(e) = self.queue.replace_all(&kept) {
            // The file still holds its old contents; only the in-memory
            // readings need to be carried over.
            tracing::error!(error = %e, "Failed to rewrite pending queue");
            self.unpersisted = kept.split_off(kept_from_file);
        }

        if delivered > 0 {
            tracing::info!(delivered, remaining = kept.len(), "Resent pending readings");
        }
        delivered
    }

    /// Attempt each reading once; return those that were not acknowledged.
    async fn deliver_each(&self, readings: Vec<Reading>) -> Vec<Reading> {
        let mut failed = Vec::new();
        for reading in readings {
            match self.delivery.deliver(&reading).await {
                Ok(()) => {
                    tracing::info!(
                        timestamp = %reading.timestamp,
                        temperature = reading.temperature,
                        "Pending reading delivered"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, timestamp = %reading.timestamp, "Pending reading not delivered");
                    failed.push(reading);
                }
            }
        }
        failed
    }

    /// Append readings (after any still held in memory) to the queue file.
    fn persist(&mut self, readings: Vec<Reading>) {
        let mut batch = std::mem::take(&mut self.unpersisted);
        batch.extend(readings);
        if batch.is_empty() {
            return;
        }
        if let Err(e) = self.queue.append_all(&batch) {
            tracing::error!(
                error = %e,
                held = batch.len(),
                "Failed to save readings locally, will retry next tick"
            );
            self.unpersisted = batch;
        }
    }

    fn pending_count(&self) -> usize {
        let on_disk = self.queue.load_all().map(|q| q.len()).unwrap_or(0);
        on_disk + self.unpersisted.len()
    }
}
