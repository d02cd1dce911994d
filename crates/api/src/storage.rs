//! Opening the configured collector store.

use std::sync::Arc;

use heatload_core::alert::NotifyFlag;
use heatload_db::{CollectorStore, JsonFileStore, SqliteStore, StoreError};

use crate::config::StorageBackend;

/// A store opened for one consumer, viewed both as the reading history and
/// as the persisted notify flag. Both views point at the same backend.
#[derive(Clone)]
pub struct StoreHandle {
    pub store: Arc<dyn CollectorStore>,
    pub flag: Arc<dyn NotifyFlag>,
}

impl StoreHandle {
    pub fn from_sqlite(store: SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            flag: store,
        }
    }

    pub fn from_file(store: JsonFileStore) -> Self {
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            flag: store,
        }
    }
}

/// Open the backend, creating and migrating it on first use.
pub async fn open_store(backend: &StorageBackend) -> Result<StoreHandle, StoreError> {
    match backend {
        StorageBackend::Sqlite { database_url } => {
            let pool = heatload_db::create_pool(database_url).await?;
            heatload_db::health_check(&pool).await?;
            heatload_db::run_migrations(&pool).await?;
            tracing::info!(%database_url, "SQLite store ready");
            Ok(StoreHandle::from_sqlite(SqliteStore::new(pool)))
        }
        StorageBackend::File {
            data_file,
            flag_file,
        } => {
            let store = JsonFileStore::open(data_file, flag_file)?;
            tracing::info!(
                data_file = %data_file.display(),
                flag_file = %flag_file.display(),
                "File store ready"
            );
            Ok(StoreHandle::from_file(store))
        }
    }
}

/// A second, independent session on the store behind `primary`.
///
/// SQLite gets its own connection pool. The file backend shares the
/// primary handle, since its lock is what keeps a reset atomic for readers.
pub async fn open_session(
    backend: &StorageBackend,
    primary: &StoreHandle,
) -> Result<StoreHandle, StoreError> {
    match backend {
        StorageBackend::Sqlite { .. } => open_store(backend).await,
        StorageBackend::File { .. } => Ok(primary.clone()),
    }
}
