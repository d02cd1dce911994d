//! Bulk-load readings from a JSON export into the configured store.
//!
//! ```text
//! heatload-import <json-file>
//! ```
//!
//! The file is a JSON array of `{timestamp, temperature}` objects, the same
//! shape the file backend writes. Entries that do not deserialize are
//! skipped with a warning; the rest are inserted in one batch.

use anyhow::{bail, Context};
use heatload_core::reading::Reading;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heatload_api::config::ServerConfig;
use heatload_api::storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatload_import=info,heatload_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: heatload-import <json-file>");
    };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {path}"))?;
    let entries: Vec<Value> =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not a JSON array"))?;
    let readings = parse_entries(entries);

    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let handle = storage::open_store(&config.storage)
        .await
        .context("Failed to open collector store")?;

    let imported = handle
        .store
        .insert_batch(&readings)
        .await
        .context("Import failed, nothing was committed")?;
    tracing::info!(imported, %path, "Import complete");
    Ok(())
}

/// Keep the entries that deserialize as readings, in file order.
fn parse_entries(entries: Vec<Value>) -> Vec<Reading> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Reading>(entry) {
            Ok(reading) => Some(reading),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn malformed_entries_are_skipped_in_order() {
        let entries = vec![
            json!({ "timestamp": "2024-07-01 10:00:00", "temperature": 21.5 }),
            json!({ "timestamp": "2024-07-01 10:00:30" }),
            json!("not an object"),
            json!({ "timestamp": "2024-07-01 10:01:00", "temperature": 22 }),
        ];

        let readings = parse_entries(entries);

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].temperature, 21.5);
        assert_eq!(readings[1].timestamp, "2024-07-01 10:01:00");
        assert_eq!(readings[1].temperature, 22.0);
    }
}
