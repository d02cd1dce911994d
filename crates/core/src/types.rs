/// Primary keys assigned by the collector store (SQLite `INTEGER PRIMARY KEY`).
pub type DbId = i64;

/// Boxed error used at trait seams implemented by other crates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
