//! Temperature sources.
//!
//! [`W1Sensor`] reads a DS18B20-style 1-Wire thermometer through the Linux
//! `w1_therm` sysfs interface. Its `w1_slave` file looks like:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line ends in `YES` when the CRC check passed; `t=` on the
//! second line is the temperature in millidegrees Celsius.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the kernel exposes 1-Wire devices.
pub const DEFAULT_W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// Family-code prefix of DS18B20 thermometers.
const THERMOMETER_PREFIX: &str = "28-";

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Failed to read sensor at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("No 1-Wire thermometer found under {0}")]
    NotFound(PathBuf),

    #[error("Sensor CRC check failed")]
    CrcFailed,

    #[error("Unexpected sensor output: {0}")]
    Malformed(String),
}

/// Something that can be asked for the current temperature in °C.
pub trait ReadingSource: Send {
    fn read_celsius(&mut self) -> Result<f64, SensorError>;
}

impl<T: ReadingSource + ?Sized> ReadingSource for Box<T> {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        (**self).read_celsius()
    }
}

/// A 1-Wire thermometer read through its `w1_slave` file.
#[derive(Debug, Clone)]
pub struct W1Sensor {
    path: PathBuf,
}

impl W1Sensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use the first thermometer (by device id) under `devices_dir`.
    pub fn discover(devices_dir: &Path) -> Result<Self, SensorError> {
        let entries = fs::read_dir(devices_dir).map_err(|source| SensorError::Io {
            path: devices_dir.to_path_buf(),
            source,
        })?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with(THERMOMETER_PREFIX))
            })
            .map(|entry| entry.path().join("w1_slave"))
            .collect();
        devices.sort();

        let path = devices
            .into_iter()
            .next()
            .ok_or_else(|| SensorError::NotFound(devices_dir.to_path_buf()))?;
        tracing::info!(path = %path.display(), "Using 1-Wire thermometer");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingSource for W1Sensor {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SensorError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_w1_slave(&raw)
    }
}

/// Extract the temperature (°C) from `w1_slave` contents.
pub fn parse_w1_slave(raw: &str) -> Result<f64, SensorError> {
    let mut lines = raw.lines();
    let crc_line = lines
        .next()
        .ok_or_else(|| SensorError::Malformed("empty output".into()))?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorError::CrcFailed);
    }

    let data_line = lines
        .next()
        .ok_or_else(|| SensorError::Malformed("missing temperature line".into()))?;
    let (_, millis) = data_line
        .split_once("t=")
        .ok_or_else(|| SensorError::Malformed(format!("no 't=' in '{data_line}'")))?;
    let millis: i64 = millis
        .trim()
        .parse()
        .map_err(|e| SensorError::Malformed(format!("bad temperature '{millis}': {e}")))?;

    Ok(millis as f64 / 1000.0)
}

/// Always reports the same temperature. For dry runs without hardware.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl ReadingSource for FixedSource {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        Ok(self.0)
    }
}
