//! Error types for Palisade.
//!
//! [`HandlerError`] is what handler logic returns; [`Fault`] is what the
//! isolation boundary captures (an error return or a panic);
//! [`ResponseError`] covers failures while writing a response.

use std::any::Any;

use thiserror::Error;

/// Error type returned by handler logic.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Free-form failure message.
    #[error("{0}")]
    Message(String),

    /// Wrapped error from handler business logic.
    #[error("{0}")]
    Custom(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates a handler error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Custom(Box::new(err))
    }
}

/// A fault captured by an execution context.
///
/// A fault is either an `Err` returned by the handler (or by a task it
/// scheduled within its context) or a panic from the same. Each context
/// delivers at most one fault.
#[derive(Debug, Error)]
pub enum Fault {
    /// The handler (or a scheduled task) returned an error.
    #[error("{0}")]
    Error(#[from] HandlerError),

    /// The handler (or a scheduled task) panicked.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl Fault {
    /// Builds a fault from a panic payload, recovering the message when
    /// the payload is a string.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panic(message)
    }
}

/// Error writing a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// The response has already been sent.
    #[error("response already sent")]
    AlreadySent,

    /// The connection went away before the response could be sent.
    #[error("connection closed before the response could be sent")]
    Disconnected,
}

impl From<ResponseError> for HandlerError {
    fn from(err: ResponseError) -> Self {
        Self::Custom(Box::new(err))
    }
}
