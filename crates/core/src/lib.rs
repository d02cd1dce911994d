//! Domain logic shared by the collector service and the sensor agent.
//!
//! Everything here is storage- and transport-agnostic: reading types and
//! validation, the accumulation policies, and the alert gate. Callers
//! supply persistence and delivery through the traits in [`alert`].

pub mod aggregation;
pub mod alert;
pub mod error;
pub mod persist;
pub mod reading;
pub mod types;
