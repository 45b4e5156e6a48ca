//! The hosting worker server.
//!
//! This crate glues the pieces together into a runnable worker: it binds
//! a TCP listener, routes incoming requests through the discovered
//! [`HandlerMap`](palisade_discovery::HandlerMap), and participates in
//! the supervised pool via [`PoolLink`]. Draining, whether initiated by
//! a handler fault through the boundary or by an operator signal, stops
//! the accept loop while in-flight connections finish.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use palisade_boundary::{DrainPolicy, FaultBoundary};
//! use palisade_discovery::{discover, UnitRegistry};
//! use palisade_server::{PoolLink, ServerConfig, ShutdownSignal, WorkerServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shutdown = ShutdownSignal::with_os_signals();
//!     let (pool, _messages) = PoolLink::new(shutdown.clone());
//!
//!     let boundary = FaultBoundary::builder()
//!         .supervisor(Arc::new(pool))
//!         .policy(DrainPolicy::from_env())
//!         .build();
//!
//!     let registry = UnitRegistry::new();
//!     let wrap = boundary.wrapper();
//!     let handlers = discover("api/handlers", &registry, &wrap)?;
//!
//!     let server = WorkerServer::new(ServerConfig::default(), handlers);
//!     server.run_with_shutdown(shutdown).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod pool;
pub mod router;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use pool::{PoolLink, WorkerMessage};
pub use router::RequestRouter;
pub use server::{ServerError, WorkerServer};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
