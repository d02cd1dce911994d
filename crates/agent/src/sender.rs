//! Delivery of a single reading to the collector.
//!
//! [`HttpDelivery`] POSTs the reading as JSON. Only a 2xx response counts as
//! an acknowledgement; transport errors, timeouts and every other status
//! are returned as [`TransportError`] for the transmitter to queue.

use std::time::Duration;

use async_trait::async_trait;
use heatload_core::reading::Reading;

/// Default HTTP timeout for one delivery attempt.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collector answered with a non-2xx status code.
    #[error("Collector returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// One delivery attempt. `Ok` means the collector acknowledged the reading.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, reading: &Reading) -> Result<(), TransportError>;
}

/// Sends readings to the collector's ingestion endpoint.
pub struct HttpDelivery {
    client: reqwest::Client,
    url: String,
}

impl HttpDelivery {
    /// Create a sender for `url` (e.g. `http://collector:8000/temperature/`).
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn deliver(&self, reading: &Reading) -> Result<(), TransportError> {
        let response = self.client.post(&self.url).json(reading).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display_http_status() {
        let err = TransportError::HttpStatus(503);
        assert_eq!(err.to_string(), "Collector returned HTTP 503");
    }

    #[test]
    fn transport_error_display_request() {
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = TransportError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }
}
