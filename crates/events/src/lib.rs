//! Outbound notification delivery for collector alerts.
//!
//! [`notifier_from_env`] picks the channel at startup: SMTP email when
//! `SMTP_HOST` is configured, otherwise a [`DisabledNotifier`] that fails
//! every send so the notify flag is never set without a delivery.

use std::sync::Arc;

use heatload_core::alert::Notifier;

pub mod delivery;

pub use delivery::email::{DisabledNotifier, EmailConfig, EmailDelivery, EmailError};

/// Build the notifier configured by the environment.
pub fn notifier_from_env() -> Arc<dyn Notifier> {
    match EmailConfig::from_env() {
        Some(config) => {
            tracing::info!(
                smtp_host = %config.smtp_host,
                smtp_port = config.smtp_port,
                to = %config.to_address,
                "Email notifications enabled"
            );
            Arc::new(EmailDelivery::new(config))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, alert notifications are disabled");
            Arc::new(DisabledNotifier)
        }
    }
}
