//! Cheap reachability check run before any delivery attempt.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

/// Default probe target: a public DNS resolver.
pub const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";

/// Default probe timeout, kept shorter than the send timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Reachable when a TCP connection to `addr` opens within `timeout`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "Connectivity probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(addr = %self.addr, timeout_secs = self.timeout.as_secs(), "Connectivity probe timed out");
                false
            }
        }
    }
}
