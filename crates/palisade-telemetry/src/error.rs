//! Telemetry error types.

use thiserror::Error;

/// Errors from telemetry initialization.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Logging initialization failed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}
