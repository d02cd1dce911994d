//! Alert delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send the
//! plain-text threshold alert. Configuration is loaded from environment
//! variables; if `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns
//! `None` and no mailer should be constructed.

use async_trait::async_trait;
use heatload_core::alert::Notifier;
use heatload_core::types::BoxError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// No SMTP server is configured.
    #[error("Email delivery is not configured (SMTP_HOST unset)")]
    NotConfigured,
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (implicit TLS).
const DEFAULT_SMTP_PORT: u16 = 465;

/// Port that selects STARTTLS instead of implicit TLS.
const STARTTLS_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` and `SMTP_USER` are not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@heatload.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 465).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Alert recipient.
    pub to_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable         | Required | Default                              |
    /// |------------------|----------|--------------------------------------|
    /// | `SMTP_HOST`      | yes      | —                                    |
    /// | `SMTP_PORT`      | no       | `465`                                |
    /// | `SMTP_USER`      | no       | —                                    |
    /// | `SMTP_PASSWORD`  | no       | —                                    |
    /// | `SMTP_FROM`      | no       | `SMTP_USER`, else `noreply@heatload.local` |
    /// | `ALERT_EMAIL_TO` | no       | the sender address                   |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        let smtp_user = std::env::var("SMTP_USER").ok();
        let from_address = std::env::var("SMTP_FROM")
            .ok()
            .or_else(|| smtp_user.clone())
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string());
        let to_address = std::env::var("ALERT_EMAIL_TO").unwrap_or_else(|_| from_address.clone());

        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address,
            to_address,
            smtp_user,
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends alert emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    /// Create a new email delivery service with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send a plain-text message to the configured recipient.
    pub async fn deliver(&self, subject: &str, body: &str) -> Result<(), EmailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(self.config.to_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let relay = if self.config.smtp_port == STARTTLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
        };
        let mut transport_builder = relay.port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = %self.config.to_address, subject, "Alert email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailDelivery {
    async fn send(&self, subject: &str, body: &str) -> Result<(), BoxError> {
        Ok(self.deliver(subject, body).await?)
    }
}

// ---------------------------------------------------------------------------
// DisabledNotifier
// ---------------------------------------------------------------------------

/// Stand-in when no SMTP server is configured. Every send fails, so the
/// alert stays armed and is retried once email is set up.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, subject: &str, _body: &str) -> Result<(), BoxError> {
        tracing::warn!(subject, "Notification dropped: email delivery not configured");
        Err(EmailError::NotConfigured.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
