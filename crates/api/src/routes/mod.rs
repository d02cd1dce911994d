//! Route tables. Handlers live in [`crate::handlers`].
//!
//! ```text
//! GET    /health                     service liveness
//!
//! POST   /temperature/               ingest one reading
//! GET    /temperature/               full stored history
//! DELETE /temperature/reset/         clear history and notify flag
//! GET    /accumulative_temperature/  aggregate + threshold check
//! ```

pub mod health;
pub mod temperature;
