//! Fault isolation and worker drain.
//!
//! [`FaultBoundary::wrap`] turns a raw handler into one whose errors,
//! synchronous or from asynchronous work it scheduled, can never escape
//! to crash the worker. A faulting request gets a best-effort 500, the
//! fault is logged, and the worker begins an orderly drain: the
//! supervising pool is notified once, the shared listener is disconnected
//! (immediately or after a grace window), and a hard-kill timer bounds
//! how long a stalled drain can leak resources.
//!
//! The drain-initiation sequence runs at most once per worker lifetime no
//! matter how many requests fault concurrently; every faulting request
//! still gets its own 500 attempt and arms its own kill timer.

pub mod boundary;
pub mod kill;
pub mod policy;
pub mod supervisor;

pub use boundary::{FaultBoundary, FaultBoundaryBuilder, INTERNAL_ERROR_BODY};
pub use kill::KillSwitch;
pub use policy::{
    DrainPolicy, DEFAULT_DISCONNECT_DELAY, DEFAULT_KILL_AFTER, SLOW_DISCONNECT_ENV,
};
pub use supervisor::{NoopSupervisor, Supervisor};
