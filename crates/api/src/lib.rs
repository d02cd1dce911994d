//! Heatload collector service library.
//!
//! Exposes config, state, error handling, routes and the background check so
//! integration tests, the server binary and the import tool share them.

pub mod accumulation;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
