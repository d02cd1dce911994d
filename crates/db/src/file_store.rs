//! Flat-file collector store.
//!
//! Readings live in a single JSON array file; the notify flag lives in a
//! separate file holding `"0"` or `"1"`. Every mutation rewrites the whole
//! file through [`write_atomic`], and all operations on one store share a
//! lock, so a concurrent reader never observes half of a reset.
//!
//! Records are kept as raw JSON values: an entry without a temperature or
//! with a malformed timestamp is preserved and surfaces from
//! [`CollectorStore::list_all`] for the aggregation policies to skip.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use heatload_core::alert::NotifyFlag;
use heatload_core::persist::write_atomic;
use heatload_core::reading::{Reading, StoredReading};
use heatload_core::types::{BoxError, DbId};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::CollectorStore;

const FLAG_SET: &str = "1";
const FLAG_CLEAR: &str = "0";
const EMPTY_ARRAY: &str = "[]";

#[derive(Debug)]
struct Inner {
    data_file: PathBuf,
    flag_file: PathBuf,
    lock: Arc<Mutex<()>>,
}

/// JSON-file-backed store. Clones share the same files and lock.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    inner: Arc<Inner>,
}

impl JsonFileStore {
    /// Open the store, creating `[]` and `0` files if they do not exist yet.
    pub fn open(
        data_file: impl Into<PathBuf>,
        flag_file: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let data_file = data_file.into();
        let flag_file = flag_file.into();

        if !data_file.exists() {
            write_atomic(&data_file, EMPTY_ARRAY.as_bytes())?;
        }
        if !flag_file.exists() {
            write_atomic(&flag_file, FLAG_CLEAR.as_bytes())?;
        }

        Ok(Self {
            inner: Arc::new(Inner {
                data_file,
                flag_file,
                lock: Arc::new(Mutex::new(())),
            }),
        })
    }

    pub fn data_file(&self) -> &Path {
        &self.inner.data_file
    }

    pub fn flag_file(&self) -> &Path {
        &self.inner.flag_file
    }

    /// Run blocking file I/O off the async executor while holding the lock.
    ///
    /// The guard moves into the blocking task, so the lock is held until the
    /// file work finishes even if the calling future is dropped first.
    async fn with_files<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let guard = Arc::clone(&self.inner.lock).lock_owned().await;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            op(&inner)
        })
        .await?
    }
}

fn read_records(path: &Path) -> Result<Vec<Value>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

fn write_records(path: &Path, records: &[Value]) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(records)?;
    write_atomic(path, &bytes)?;
    Ok(())
}

/// Ids are 1-based positions: the file is append-only between resets.
fn to_stored(index: usize, record: &Value) -> StoredReading {
    StoredReading {
        id: index as DbId + 1,
        timestamp: record
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        temperature: record.get("temperature").and_then(Value::as_f64),
    }
}

fn read_flag(path: &Path) -> Result<bool, StoreError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(raw.trim() == FLAG_SET),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CollectorStore for JsonFileStore {
    async fn insert(&self, reading: &Reading) -> Result<DbId, StoreError> {
        let record = serde_json::to_value(reading)?;
        let id = self
            .with_files(move |files| {
                let mut records = read_records(&files.data_file)?;
                records.push(record);
                write_records(&files.data_file, &records)?;
                Ok(records.len() as DbId)
            })
            .await?;
        tracing::debug!(id, timestamp = %reading.timestamp, "Reading stored");
        Ok(id)
    }

    async fn insert_batch(&self, readings: &[Reading]) -> Result<u64, StoreError> {
        let new_records = readings
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let count = new_records.len() as u64;
        self.with_files(move |files| {
            let mut records = read_records(&files.data_file)?;
            records.extend(new_records);
            write_records(&files.data_file, &records)
        })
        .await?;
        Ok(count)
    }

    async fn list_all(&self) -> Result<Vec<StoredReading>, StoreError> {
        self.with_files(|files| {
            let records = read_records(&files.data_file)?;
            Ok(records
                .iter()
                .enumerate()
                .map(|(i, record)| to_stored(i, record))
                .collect())
        })
        .await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.with_files(|files| {
            let previous = match fs::read(&files.data_file) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };

            write_atomic(&files.data_file, EMPTY_ARRAY.as_bytes())?;

            if let Err(e) = write_atomic(&files.flag_file, FLAG_CLEAR.as_bytes()) {
                // Put the readings back so the reset is all-or-nothing.
                let restored = match &previous {
                    Some(bytes) => write_atomic(&files.data_file, bytes),
                    None => heatload_core::persist::remove_if_exists(&files.data_file),
                };
                if let Err(restore_err) = restored {
                    tracing::error!(error = %restore_err, "Failed to roll back readings after reset failure");
                }
                return Err(e.into());
            }
            Ok(())
        })
        .await?;
        tracing::info!(data_file = %self.data_file().display(), "Collector store reset");
        Ok(())
    }
}

#[async_trait]
impl NotifyFlag for JsonFileStore {
    async fn is_notified(&self) -> Result<bool, BoxError> {
        Ok(self.with_files(|files| read_flag(&files.flag_file)).await?)
    }

    async fn set_notified(&self) -> Result<(), BoxError> {
        self.with_files(|files| {
            write_atomic(&files.flag_file, FLAG_SET.as_bytes())?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}
