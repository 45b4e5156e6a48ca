//! Structured logging for Palisade workers.
//!
//! One worker process emits one log stream; fault logging in the
//! isolation boundary and drain progress in the server both go through
//! `tracing`, and this crate wires the subscriber.

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
