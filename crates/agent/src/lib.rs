//! `heatload-agent` library crate.
//!
//! Sensor-node side of heatload: sample a thermometer, relay readings to the
//! collector, and keep anything that could not be delivered in a local
//! queue until it can be. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod probe;
pub mod queue;
pub mod sender;
pub mod sensor;
pub mod transmitter;
