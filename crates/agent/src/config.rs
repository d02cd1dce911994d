use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::probe::{DEFAULT_PROBE_ADDR, DEFAULT_PROBE_TIMEOUT};
use crate::queue::DEFAULT_QUEUE_FILE;
use crate::sender::DEFAULT_SEND_TIMEOUT;
use crate::transmitter::DEFAULT_SAMPLE_INTERVAL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ingestion endpoint, e.g. `http://10.0.0.5:8000/temperature/`.
    pub collector_url: String,
    pub queue_file: PathBuf,
    pub sample_interval: Duration,
    /// `host:port` opened by the connectivity probe.
    pub probe_addr: String,
    pub probe_timeout: Duration,
    pub send_timeout: Duration,
    /// Explicit `w1_slave` path; discovered when unset.
    pub sensor_path: Option<PathBuf>,
    /// Report this temperature instead of reading hardware.
    pub fixed_temperature: Option<f64>,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable               | Required | Default            |
    /// |------------------------|----------|--------------------|
    /// | `COLLECTOR_URL`        | yes      | --                 |
    /// | `QUEUE_FILE`           | no       | `unsent_data.json` |
    /// | `SAMPLE_INTERVAL_SECS` | no       | `30`               |
    /// | `PROBE_ADDR`           | no       | `8.8.8.8:53`       |
    /// | `PROBE_TIMEOUT_SECS`   | no       | `5`                |
    /// | `SEND_TIMEOUT_SECS`    | no       | `10`               |
    /// | `SENSOR_PATH`          | no       | first `28-*` device under `/sys/bus/w1/devices` |
    /// | `FIXED_TEMPERATURE`    | no       | --                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        let collector_url =
            std::env::var("COLLECTOR_URL").map_err(|_| ConfigError::Missing("COLLECTOR_URL"))?;

        let fixed_temperature = match std::env::var("FIXED_TEMPERATURE") {
            Ok(raw) => Some(parse_value("FIXED_TEMPERATURE", &raw)?),
            Err(_) => None,
        };

        Ok(Self {
            collector_url,
            queue_file: queue_file_from_env(),
            sample_interval: secs_var("SAMPLE_INTERVAL_SECS", DEFAULT_SAMPLE_INTERVAL)?,
            probe_addr: std::env::var("PROBE_ADDR").unwrap_or_else(|_| DEFAULT_PROBE_ADDR.into()),
            probe_timeout: secs_var("PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT)?,
            send_timeout: secs_var("SEND_TIMEOUT_SECS", DEFAULT_SEND_TIMEOUT)?,
            sensor_path: std::env::var("SENSOR_PATH").ok().map(PathBuf::from),
            fixed_temperature,
        })
    }
}

/// Queue location alone; all `--reset` needs.
pub fn queue_file_from_env() -> PathBuf {
    std::env::var("QUEUE_FILE")
        .unwrap_or_else(|_| DEFAULT_QUEUE_FILE.into())
        .into()
}

fn secs_var(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs: u64 = parse_value(var, &raw)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var,
                    value: raw,
                    reason: "must be at least 1 second".into(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
