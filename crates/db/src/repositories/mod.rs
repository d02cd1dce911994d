//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods take any SQLite executor so they compose inside a transaction.

pub mod notify_state_repo;
pub mod temperature_repo;

pub use notify_state_repo::NotifyStateRepo;
pub use temperature_repo::TemperatureRepo;
