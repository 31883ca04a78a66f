//! Logging infrastructure for snowcat.
//!
//! This crate provides:
//! - Structured logging in JSON or pretty format, filtered by `RUST_LOG`
//!   or a configured level
//! - Standard event names and `log_*!` macros that attach them
//!
//! # Usage
//!
//! ```ignore
//! use snowcat_telemetry::{LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Json);
//!
//! snowcat_telemetry::init(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging as init};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
