//! Core types and traits for the Palisade handler host.
//!
//! This crate defines the vocabulary shared by the discovery and
//! fault-isolation crates:
//!
//! - [`Request`] and [`ResponseHandle`]: the request/response pair a
//!   handler operates on
//! - [`BoxHandler`] and [`Next`]: the `(request, response, continuation)`
//!   calling convention
//! - [`ExecutionContext`] and [`ScopeHandle`]: the per-request error
//!   scope that captures faults from the handler and from any
//!   asynchronous work it schedules
//! - [`WorkerLifecycle`]: the process-wide `Active -> Draining` state

pub mod context;
pub mod error;
pub mod handler;
pub mod request;
pub mod response;
pub mod worker;

pub use context::{ExecutionContext, ScopeHandle};
pub use error::{Fault, HandlerError, ResponseError};
pub use handler::{handler_fn, BoxHandler, HandlerFuture, Next};
pub use request::{Request, RequestId};
pub use response::{FinishedResponse, ResponseHandle};
pub use worker::{WorkerLifecycle, WorkerState};
