//! Courtside Core Library
//!
//! Shared functionality for Courtside components:
//! - Configuration resolution and hierarchy
//! - SQLite pool helpers and the `define_database!` macro
//! - Tracing / `OpenTelemetry` initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod record;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
