//! # Palisade
//!
//! **A fault-isolating handler host for supervised worker pools**
//!
//! Palisade discovers request-handling units from a nested directory
//! tree, binds them into a routing map keyed by path segment and HTTP
//! method, and wraps every bound handler in a fault-isolation boundary:
//!
//! - A handler fault, synchronous or from asynchronous work the handler
//!   scheduled, never crashes the worker outright.
//! - The faulting request gets a best-effort 500; sibling in-flight
//!   requests are unaffected.
//! - The worker drains: it notifies its supervising pool once, stops
//!   accepting connections (immediately or after a grace window), and
//!   lets in-flight connections finish.
//! - A hard-kill timer bounds how long a stalled drain can leak
//!   resources.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use palisade::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::default())?;
//!
//!     let mut registry = UnitRegistry::new();
//!     registry.register(
//!         "users",
//!         OperationSet::new().operation("get", handler_fn(
//!             |_req: Request, res: ResponseHandle, _next: Next| async move {
//!                 res.send("[]")?;
//!                 Ok(())
//!             },
//!         )),
//!     );
//!
//!     let shutdown = ShutdownSignal::with_os_signals();
//!     let (pool, _messages) = PoolLink::new(shutdown.clone());
//!
//!     let boundary = FaultBoundary::builder()
//!         .supervisor(Arc::new(pool))
//!         .policy(DrainPolicy::from_env())
//!         .build();
//!
//!     let wrap = boundary.wrapper();
//!     let handlers = discover("api/handlers", &registry, &wrap)?;
//!
//!     let server = WorkerServer::new(ServerConfig::default(), handlers);
//!     server.run_with_shutdown(shutdown).await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/palisade/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use palisade_core as core;

// Re-export discovery types
pub use palisade_discovery as discovery;

// Re-export the fault-isolation boundary
pub use palisade_boundary as boundary;

// Re-export the hosting server
pub use palisade_server as server;

// Re-export telemetry
pub use palisade_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use palisade::prelude::*;
/// ```
pub mod prelude {
    pub use palisade_core::{
        handler_fn, BoxHandler, ExecutionContext, Fault, HandlerError, Next, Request, RequestId,
        ResponseHandle, ScopeHandle, WorkerLifecycle, WorkerState,
    };

    pub use palisade_discovery::{
        discover, DiscoveryError, HandlerMap, HandlerNode, HandlerSource, HandlerUnit,
        OperationSet, UnitRegistry,
    };

    pub use palisade_boundary::{
        DrainPolicy, FaultBoundary, KillSwitch, NoopSupervisor, Supervisor,
    };

    pub use palisade_server::{
        PoolLink, ServerConfig, ShutdownSignal, WorkerMessage, WorkerServer,
    };

    pub use palisade_telemetry::{init_logging, LogConfig};
}
