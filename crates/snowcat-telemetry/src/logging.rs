//! Structured logging to stderr.
//!
//! Stdout is reserved for operator output (route tables, rendered
//! documents, "generated!" notices), so every log layer writes to stderr.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Build the env filter from config or RUST_LOG
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log event names.
pub mod events {
    /// A command is starting.
    pub const STARTUP: &str = "startup";

    /// The process is shutting down.
    pub const SHUTDOWN: &str = "shutdown";

    /// A server is listening on an address.
    pub const LISTENING: &str = "listening";

    /// A watch session started observing its paths.
    pub const WATCHING: &str = "watching";

    /// A rebuild pass began.
    pub const REBUILD_STARTED: &str = "rebuild_started";

    /// A rebuild pass finished successfully.
    pub const REBUILD_COMPLETED: &str = "rebuild_completed";

    /// A rebuild pass failed; the watch loop keeps running.
    pub const REBUILD_FAILED: &str = "rebuild_failed";

    /// The file watcher reported an error.
    pub const WATCHER_ERROR: &str = "watcher_error";

    /// A mock request has been answered.
    pub const REQUEST_COMPLETED: &str = "request_completed";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SHUTDOWN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LISTENING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_watching {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::WATCHING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_rebuild_started {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::REBUILD_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_rebuild_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REBUILD_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_rebuild_failed {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::REBUILD_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_watcher_error {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::WATCHER_ERROR,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REQUEST_COMPLETED,
            $($field)*
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // Logging can only be initialized once per process, so these tests
    // cover the configuration side.

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("invalid"), None);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_event_names_are_distinct() {
        let names = [
            events::STARTUP,
            events::SHUTDOWN,
            events::LISTENING,
            events::WATCHING,
            events::REBUILD_STARTED,
            events::REBUILD_COMPLETED,
            events::REBUILD_FAILED,
            events::WATCHER_ERROR,
            events::REQUEST_COMPLETED,
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
