//! Collector persistence.
//!
//! Two interchangeable backends implement [`store::CollectorStore`] and
//! [`heatload_core::alert::NotifyFlag`]:
//! - [`store::SqliteStore`]: sqlx over SQLite, readings and flag in one
//!   database so a reset is a single transaction.
//! - [`file_store::JsonFileStore`]: a JSON array file plus a `"0"`/`"1"`
//!   flag file, each replaced atomically.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub mod error;
pub mod file_store;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use file_store::JsonFileStore;
pub use store::{CollectorStore, SqliteStore};

pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool from a database URL, creating the file if needed.
///
/// In-memory URLs get a single connection: every SQLite connection to
/// `:memory:` opens its own private database.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations under `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
