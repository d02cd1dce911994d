//! Threshold alert gating for the accumulative temperature.
//!
//! [`AlertGate`] fires a notification the first time the accumulative
//! temperature exceeds its threshold and then stays quiet until the
//! persisted [`NotifyFlag`] is cleared by an administrative reset. The flag
//! is one bit for the whole collector, not one per crossing.
//!
//! Delivery and persistence are injected:
//! - [`Notifier`]: sends `(subject, body)`; any error leaves the flag clear
//!   so the next check retries.
//! - [`NotifyFlag`]: owns the persisted `notified` bit.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::types::BoxError;

/// Subject line of the alert notification.
pub const ALERT_SUBJECT: &str = "Accumulative temperature alert";

/// Outbound notification channel (e.g. SMTP).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), BoxError>;
}

/// Persisted "already notified" bit.
#[async_trait]
pub trait NotifyFlag: Send + Sync {
    async fn is_notified(&self) -> Result<bool, BoxError>;

    async fn set_notified(&self) -> Result<(), BoxError>;
}

/// What a single [`AlertGate::check`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Value did not exceed the threshold.
    BelowThreshold,
    /// Above threshold, but a notification was already delivered.
    AlreadyNotified,
    /// Notification delivered during this check.
    Notified,
    /// Notifier failed; the flag stays clear and the next check retries.
    NotifierFailed,
    /// The flag could not be read, so nothing was sent.
    FlagUnavailable,
}

/// Compares the accumulative temperature to a threshold and notifies at
/// most once while the flag is set.
pub struct AlertGate {
    threshold: f64,
    flag: Arc<dyn NotifyFlag>,
    notifier: Arc<dyn Notifier>,
    /// Serializes checks so concurrent callers cannot both observe a clear
    /// flag and both notify. Also held across reset so a check never acts on
    /// history read before the reset.
    check_lock: Mutex<()>,
}

impl AlertGate {
    pub fn new(threshold: f64, flag: Arc<dyn NotifyFlag>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            threshold,
            flag,
            notifier,
            check_lock: Mutex::new(()),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Take the gate exclusively.
    ///
    /// While the returned guard lives no other check runs, so a caller can
    /// read the history, aggregate it and check the result as one step, or
    /// reset the history and flag without a check interleaving.
    pub async fn lock(&self) -> GateGuard<'_> {
        GateGuard {
            gate: self,
            _lock: self.check_lock.lock().await,
        }
    }

    /// Run one threshold check against `accumulative_temperature`.
    pub async fn check(&self, accumulative_temperature: f64) -> AlertOutcome {
        self.lock().await.check(accumulative_temperature).await
    }
}

/// Exclusive hold on an [`AlertGate`], from [`AlertGate::lock`].
pub struct GateGuard<'a> {
    gate: &'a AlertGate,
    _lock: MutexGuard<'a, ()>,
}

impl GateGuard<'_> {
    /// Run one threshold check while holding the gate.
    pub async fn check(&self, accumulative_temperature: f64) -> AlertOutcome {
        let gate = self.gate;
        if accumulative_temperature <= gate.threshold {
            return AlertOutcome::BelowThreshold;
        }

        match gate.flag.is_notified().await {
            Ok(true) => return AlertOutcome::AlreadyNotified,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Could not read notify flag, skipping alert");
                return AlertOutcome::FlagUnavailable;
            }
        }

        tracing::warn!(
            accumulative_temperature,
            threshold = gate.threshold,
            "Threshold exceeded, sending notification"
        );

        let body = alert_body(accumulative_temperature);
        if let Err(e) = gate.notifier.send(ALERT_SUBJECT, &body).await {
            tracing::error!(error = %e, "Alert notification failed, will retry on next check");
            return AlertOutcome::NotifierFailed;
        }

        if let Err(e) = gate.flag.set_notified().await {
            tracing::error!(error = %e, "Notification sent but notify flag could not be persisted");
        }
        tracing::info!(accumulative_temperature, "Alert notification delivered");
        AlertOutcome::Notified
    }
}

fn alert_body(accumulative_temperature: f64) -> String {
    format!(
        "The accumulative temperature has reached the threshold.\n\
         Current accumulative temperature: {accumulative_temperature}°C"
    )
}

/// Process-local [`NotifyFlag`], for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryNotifyFlag {
    notified: AtomicBool,
}

impl InMemoryNotifyFlag {
    pub fn new(notified: bool) -> Self {
        Self {
            notified: AtomicBool::new(notified),
        }
    }

    pub fn clear(&self) {
        self.notified.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotifyFlag for InMemoryNotifyFlag {
    async fn is_notified(&self) -> Result<bool, BoxError> {
        Ok(self.notified.load(Ordering::SeqCst))
    }

    async fn set_notified(&self) -> Result<(), BoxError> {
        self.notified.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// [`Notifier`] that records what it was asked to send.
///
/// Optionally fails every call, to exercise the retry path.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call to `send`, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that were delivered.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), BoxError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err("notifier unavailable".into());
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((subject.to_string(), body.to_string()));
        }
        Ok(())
    }
}
