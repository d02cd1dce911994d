//! Accumulation policies: turn a reading history into a cumulative
//! "heat load" value.
//!
//! Both policies are pure functions over [`StoredReading`]s, so any store
//! backend can feed them. Records whose timestamp does not parse or that
//! carry no temperature are skipped with a warning; the rest of the history
//! is still aggregated.
//!
//! - [`windowed_maximum`]: fixed-length windows anchored at the first valid
//!   reading; the maximum of every non-empty window is summed.
//! - [`daily_maximum`]: one maximum per calendar date, summed.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reading::{format_timestamp, parse_timestamp, StoredReading};

/// Default window length for the windowed policy.
pub const DEFAULT_WINDOW_MINUTES: i64 = 5;

/// Label format for daily max points.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A contributing maximum: `(label, value)`, serialized as a two-element array.
///
/// The label is the timestamp at which a window maximum occurred, or the
/// calendar date for the daily policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxPoint(pub String, pub f64);

/// Result of an accumulation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulation {
    pub accumulative_temperature: f64,
    pub max_points: Vec<MaxPoint>,
}

impl Accumulation {
    pub fn empty() -> Self {
        Self {
            accumulative_temperature: 0.0,
            max_points: Vec::new(),
        }
    }

    fn push(&mut self, label: String, value: f64) {
        self.accumulative_temperature += value;
        self.max_points.push(MaxPoint(label, value));
    }
}

/// Which aggregation the collector runs. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Sum of per-window maxima over windows of the given length.
    Windowed { window: Duration },
    /// Sum of per-calendar-date maxima.
    Daily,
}

impl AggregationPolicy {
    /// Windowed policy with a window of `minutes`. Must be positive.
    pub fn windowed_minutes(minutes: i64) -> Result<Self, CoreError> {
        if minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "window length must be positive, got {minutes} minutes"
            )));
        }
        Ok(Self::Windowed {
            window: Duration::minutes(minutes),
        })
    }

    pub fn accumulate(&self, readings: &[StoredReading]) -> Accumulation {
        match self {
            Self::Windowed { window } => windowed_maximum(readings, *window),
            Self::Daily => daily_maximum(readings),
        }
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::Windowed {
            window: Duration::minutes(DEFAULT_WINDOW_MINUTES),
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = CoreError;

    /// Accepts `windowed` (default window length) or `daily`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windowed" | "window" => Ok(Self::default()),
            "daily" | "day" => Ok(Self::Daily),
            other => Err(CoreError::Validation(format!(
                "unknown aggregation policy '{other}' (expected 'windowed' or 'daily')"
            ))),
        }
    }
}

/// Parse and order the usable part of a history.
///
/// The sort is stable, so readings sharing a timestamp keep their
/// insertion order.
fn valid_samples(readings: &[StoredReading]) -> Vec<(NaiveDateTime, f64)> {
    let mut samples: Vec<(NaiveDateTime, f64)> = readings
        .iter()
        .filter_map(|r| {
            let Some(temperature) = r.temperature else {
                tracing::warn!(id = r.id, timestamp = %r.timestamp, "Skipping record without temperature");
                return None;
            };
            match parse_timestamp(&r.timestamp) {
                Ok(ts) => Some((ts, temperature)),
                Err(e) => {
                    tracing::warn!(id = r.id, error = %e, "Skipping record with malformed timestamp");
                    None
                }
            }
        })
        .collect();
    samples.sort_by_key(|(ts, _)| *ts);
    samples
}

/// Sum the maxima of consecutive fixed-length windows.
///
/// The first window is anchored at the earliest valid reading and covers
/// `[anchor, anchor + window]`. A reading past the current window end closes
/// the window and moves the end forward by as many whole windows as needed
/// to cover it, so gaps in the data never produce empty entries.
pub fn windowed_maximum(readings: &[StoredReading], window: Duration) -> Accumulation {
    let samples = valid_samples(readings);
    let Some(&(anchor, _)) = samples.first() else {
        return Accumulation::empty();
    };

    let step_ms = window.num_milliseconds().max(1);
    let mut result = Accumulation::empty();
    let mut window_end = anchor + Duration::milliseconds(step_ms);
    let mut current: Option<(NaiveDateTime, f64)> = None;

    for &(ts, temperature) in &samples {
        if ts > window_end {
            if let Some((max_time, max_value)) = current.take() {
                result.push(format_timestamp(max_time), max_value);
            }
            let behind_ms = (ts - window_end).num_milliseconds();
            let whole_windows = (behind_ms + step_ms - 1) / step_ms;
            window_end += Duration::milliseconds(whole_windows * step_ms);
        }

        match current {
            Some((_, max_value)) if temperature <= max_value => {}
            _ => current = Some((ts, temperature)),
        }
    }

    if let Some((max_time, max_value)) = current {
        result.push(format_timestamp(max_time), max_value);
    }

    result
}

/// Sum the maximum temperature of every calendar date present.
///
/// Max points are keyed by date (`YYYY-MM-DD`) in ascending order.
pub fn daily_maximum(readings: &[StoredReading]) -> Accumulation {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (ts, temperature) in valid_samples(readings) {
        per_day
            .entry(ts.date())
            .and_modify(|max| {
                if temperature > *max {
                    *max = temperature;
                }
            })
            .or_insert(temperature);
    }

    let mut result = Accumulation::empty();
    for (date, max_value) in per_day {
        result.push(date.format(DATE_FORMAT).to_string(), max_value);
    }
    result
}
