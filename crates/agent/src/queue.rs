//! Durable queue of readings the collector has not acknowledged yet.
//!
//! The queue is one JSON array file, rewritten whole on every change through
//! [`write_atomic`], so a crash mid-write leaves the previous snapshot in
//! place. The file only exists while something is pending: it is created on
//! the first failed send and removed once the queue empties.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use heatload_core::persist::{remove_if_exists, write_atomic};
use heatload_core::reading::Reading;

/// Default queue file, relative to the working directory.
pub const DEFAULT_QUEUE_FILE: &str = "unsent_data.json";

/// Suffix appended to a queue file that could not be decoded.
const QUARANTINE_SUFFIX: &str = ".corrupt";

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Queue file {path} is not a valid reading list: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode queue: {0}")]
    Encode(serde_json::Error),
}

/// File-backed FIFO of pending readings.
#[derive(Debug, Clone)]
pub struct PendingQueue {
    path: PathBuf,
}

impl PendingQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every pending reading in insertion order. A missing file is an empty queue.
    pub fn load_all(&self) -> Result<Vec<Reading>, QueueError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| QueueError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn append(&self, reading: &Reading) -> Result<(), QueueError> {
        self.append_all(std::slice::from_ref(reading))
    }

    /// Add readings to the end of the queue.
    ///
    /// An undecodable queue file is moved aside to `<file>.corrupt` (numbered
    /// if that name is taken) and a fresh queue is started, so new readings
    /// are never blocked by it.
    pub fn append_all(&self, readings: &[Reading]) -> Result<(), QueueError> {
        let mut pending = match self.load_all() {
            Ok(pending) => pending,
            Err(QueueError::Corrupt { source, .. }) => {
                let moved_to = self.quarantine()?;
                tracing::error!(
                    error = %source,
                    moved_to = %moved_to.display(),
                    "Pending queue file was corrupt, moved aside"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        pending.extend_from_slice(readings);
        self.write(&pending)
    }

    /// Replace the whole queue. An empty slice removes the file.
    pub fn replace_all(&self, readings: &[Reading]) -> Result<(), QueueError> {
        if readings.is_empty() {
            return self.clear();
        }
        self.write(readings)
    }

    /// Drop every pending reading.
    pub fn clear(&self) -> Result<(), QueueError> {
        remove_if_exists(&self.path)?;
        Ok(())
    }

    fn write(&self, readings: &[Reading]) -> Result<(), QueueError> {
        let bytes = serde_json::to_vec_pretty(readings).map_err(QueueError::Encode)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    /// Move the queue file to the first free name of `<file>.corrupt`,
    /// `<file>.corrupt.1`, `<file>.corrupt.2`, ...
    fn quarantine(&self) -> Result<PathBuf, QueueError> {
        let target = (0u32..)
            .map(|n| self.quarantine_path(n))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| io::Error::other("no free quarantine file name"))?;
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn quarantine_path(&self, n: u32) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(QUARANTINE_SUFFIX);
        if n > 0 {
            name.push(format!(".{n}"));
        }
        PathBuf::from(name)
    }
}
