//! Temperature reading types and the client-side plausibility check.
//!
//! A [`Reading`] is what the agent samples and transmits. A
//! [`StoredReading`] is what the collector hands back from its store: the
//! collector accepts anything at ingestion, so a stored record may carry an
//! unparseable timestamp or no temperature at all. Those records are
//! filtered by the aggregation policies, never rejected on arrival.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Wire and storage format of a reading timestamp (local time, no zone).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Lowest temperature (°C) the agent accepts from its sensor.
pub const MIN_VALID_TEMPERATURE: f64 = -10.0;

/// Highest temperature (°C) the agent accepts from its sensor.
pub const MAX_VALID_TEMPERATURE: f64 = 100.0;

/// One timestamped temperature sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Local time formatted with [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
    /// Degrees Celsius.
    pub temperature: f64,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, temperature: f64) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            temperature,
        }
    }

    /// Stamp a freshly sampled temperature with the current local time.
    pub fn now(temperature: f64) -> Self {
        Self::new(Local::now().naive_local(), temperature)
    }

    /// Reject physically implausible values before they enter the queue.
    pub fn validate(&self) -> Result<(), CoreError> {
        if is_valid_temperature(self.temperature) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "temperature {} outside [{MIN_VALID_TEMPERATURE}, {MAX_VALID_TEMPERATURE}]",
                self.temperature
            )))
        }
    }
}

/// A reading as persisted by the collector, plus its generated identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: DbId,
    pub timestamp: String,
    pub temperature: Option<f64>,
}

/// `true` iff `-10 <= temperature <= 100`. NaN is never valid.
pub fn is_valid_temperature(temperature: f64) -> bool {
    (MIN_VALID_TEMPERATURE..=MAX_VALID_TEMPERATURE).contains(&temperature)
}

/// Parse a stored timestamp, tolerating surrounding whitespace.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, CoreError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| CoreError::Parse(format!("invalid timestamp '{raw}': {e}")))
}

pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(is_valid_temperature(-10.0));
        assert!(is_valid_temperature(100.0));
        assert!(is_valid_temperature(21.5));
    }

    #[test]
    fn out_of_range_values_are_invalid() {
        assert!(!is_valid_temperature(-10.0625));
        assert!(!is_valid_temperature(100.5));
        assert!(!is_valid_temperature(85_000.0));
        assert!(!is_valid_temperature(f64::NAN));
    }

    #[test]
    fn validate_reports_the_offending_value() {
        let reading = Reading {
            timestamp: "2024-07-01 12:00:00".to_string(),
            temperature: 127.0,
        };
        let err = reading.validate().unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("127"));
    }

    #[test]
    fn new_formats_with_single_space_separator() {
        let ts = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 5, 3)
            .unwrap();
        let reading = Reading::new(ts, 20.0);
        assert_eq!(reading.timestamp, "2024-07-01 09:05:03");
    }

    #[test]
    fn parse_accepts_padded_input() {
        let ts = parse_timestamp("  2024-07-01 09:05:03\n").unwrap();
        assert_eq!(format_timestamp(ts), "2024-07-01 09:05:03");
    }

    #[test]
    fn parse_rejects_other_formats() {
        assert_matches!(parse_timestamp("2024-07-01T09:05:03"), Err(CoreError::Parse(_)));
        assert_matches!(parse_timestamp("yesterday"), Err(CoreError::Parse(_)));
        assert_matches!(parse_timestamp(""), Err(CoreError::Parse(_)));
    }

    #[test]
    fn reading_serializes_as_flat_object() {
        let reading = Reading {
            timestamp: "2024-07-01 09:05:03".to_string(),
            temperature: 23.25,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["timestamp"], "2024-07-01 09:05:03");
        assert_eq!(json["temperature"], 23.25);
    }
}
