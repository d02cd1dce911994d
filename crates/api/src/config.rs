use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use heatload_core::aggregation::{AggregationPolicy, DEFAULT_WINDOW_MINUTES};

/// Default alert threshold for the accumulative temperature (°C).
pub const DEFAULT_ALERT_THRESHOLD: f64 = 255.0;

/// Default period of the background accumulation check.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// A configuration variable was present but could not be used.
#[derive(Debug, thiserror::Error)]
#[error("{var} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Where the collector keeps readings and the notify flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLite database at `database_url`.
    Sqlite { database_url: String },
    /// JSON array file plus a `"0"`/`"1"` flag file.
    File {
        data_file: PathBuf,
        flag_file: PathBuf,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single collector on a LAN.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins; a single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    pub policy: AggregationPolicy,
    /// Notification fires when the accumulative temperature is strictly above this.
    pub alert_threshold: f64,
    /// Period of the background accumulation check.
    pub check_interval: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                   |
    /// |------------------------|---------------------------|
    /// | `HOST`                 | `0.0.0.0`                 |
    /// | `PORT`                 | `8000`                    |
    /// | `CORS_ORIGINS`         | `*`                       |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                      |
    /// | `STORAGE_BACKEND`      | `sqlite` (or `file`)      |
    /// | `DATABASE_URL`         | `sqlite://temperature.db` |
    /// | `DATA_FILE`            | `temperature_data.json`   |
    /// | `NOTIFY_FLAG_FILE`     | `notified.flag`           |
    /// | `AGGREGATION_POLICY`   | `windowed` (or `daily`)   |
    /// | `WINDOW_MINUTES`       | `5`                       |
    /// | `ALERT_THRESHOLD`      | `255`                     |
    /// | `CHECK_INTERVAL_SECS`  | `300`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", 8000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30)?;

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "sqlite".into());
        let storage = match backend.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => StorageBackend::Sqlite {
                database_url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://temperature.db".into()),
            },
            "file" | "json" => StorageBackend::File {
                data_file: std::env::var("DATA_FILE")
                    .unwrap_or_else(|_| "temperature_data.json".into())
                    .into(),
                flag_file: std::env::var("NOTIFY_FLAG_FILE")
                    .unwrap_or_else(|_| "notified.flag".into())
                    .into(),
            },
            _ => {
                return Err(ConfigError {
                    var: "STORAGE_BACKEND",
                    value: backend,
                    reason: "expected 'sqlite' or 'file'".into(),
                })
            }
        };

        let policy = match std::env::var("AGGREGATION_POLICY") {
            Ok(raw) => AggregationPolicy::from_str(&raw).map_err(|e| ConfigError {
                var: "AGGREGATION_POLICY",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => AggregationPolicy::default(),
        };
        let policy = match policy {
            AggregationPolicy::Windowed { .. } => {
                let minutes: i64 = parse_var("WINDOW_MINUTES", DEFAULT_WINDOW_MINUTES)?;
                AggregationPolicy::windowed_minutes(minutes).map_err(|e| ConfigError {
                    var: "WINDOW_MINUTES",
                    value: minutes.to_string(),
                    reason: e.to_string(),
                })?
            }
            AggregationPolicy::Daily => AggregationPolicy::Daily,
        };

        let alert_threshold: f64 = parse_var("ALERT_THRESHOLD", DEFAULT_ALERT_THRESHOLD)?;
        if !alert_threshold.is_finite() {
            return Err(ConfigError {
                var: "ALERT_THRESHOLD",
                value: alert_threshold.to_string(),
                reason: "must be a finite number".into(),
            });
        }

        let check_interval_secs: u64 = parse_var("CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL_SECS)?;
        if check_interval_secs == 0 {
            return Err(ConfigError {
                var: "CHECK_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            storage,
            policy,
            alert_threshold,
            check_interval: Duration::from_secs(check_interval_secs),
        })
    }

    /// `true` when CORS should accept any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Read `var` and parse it, falling back to `default` when unset.
fn parse_var<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
