//! The worker's HTTP serving loop.
//!
//! Built on Hyper and Tokio, adapted to the drain model: the accept loop
//! runs until the [`ShutdownSignal`] fires, then stops taking new
//! connections while already-accepted ones run to completion, bounded by
//! the configured shutdown timeout. There is no per-request timeout;
//! the hard-kill timer armed on fault is the only terminal deadline.

use std::convert::Infallible;
use std::net::SocketAddr;

use http::Request;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use palisade_discovery::HandlerMap;

use crate::config::ServerConfig;
use crate::router::{HttpResponse, RequestRouter};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors from running the worker server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be bound.
    #[error("bind error: {0}")]
    Bind(String),

    /// An I/O error during serving.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A worker serving one discovered handler tree.
///
/// # Example
///
/// ```rust,no_run
/// use palisade_discovery::HandlerMap;
/// use palisade_server::{ServerConfig, ShutdownSignal, WorkerServer};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), palisade_server::ServerError> {
/// let server = WorkerServer::new(ServerConfig::default(), HandlerMap::new());
/// server.run_with_shutdown(ShutdownSignal::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WorkerServer {
    config: ServerConfig,
    router: RequestRouter,
}

impl WorkerServer {
    /// Creates a worker over a discovered handler tree.
    #[must_use]
    pub fn new(config: ServerConfig, handlers: HandlerMap) -> Self {
        Self {
            config,
            router: RequestRouter::new(handlers),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the request router.
    #[must_use]
    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// Runs the worker until SIGTERM/SIGINT.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the worker until the given signal fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the configured address cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!(
                "Invalid address '{}': {}",
                self.config.http_addr(),
                e
            ))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("Worker listening on {}", addr);
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already-bound listener until the
    /// signal fires, then drains.
    ///
    /// # Errors
    ///
    /// Currently infallible past binding; the signature leaves room for
    /// accept-loop failures to become fatal.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let router = self.router.clone();
                            let token = tracker.acquire();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(router, stream, remote_addr).await {
                                    tracing::error!("Connection error from {}: {}", remote_addr, e);
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown.recv() => {
                    tracing::info!("Drain signal received, no longer accepting connections");
                    break;
                }
            }
        }

        // The listener drops here; in-flight connections keep running.
        drop(listener);

        let drain_timeout = self.config.shutdown_timeout();
        tracing::info!(
            "Waiting up to {:?} for {} in-flight connections",
            drain_timeout,
            tracker.active_connections()
        );

        tokio::select! {
            _ = tracker.wait_idle() => {
                tracing::info!("All connections finished");
            }
            _ = tokio::time::sleep(drain_timeout) => {
                tracing::warn!(
                    "Drain timeout reached, {} connections still active",
                    tracker.active_connections()
                );
            }
        }

        tracing::info!("Worker stopped");
        Ok(())
    }
}

/// Serves one connection. Runs to completion even during a drain; that
/// is the point of draining.
async fn handle_connection(
    router: RequestRouter,
    stream: TcpStream,
    remote_addr: SocketAddr,
) -> Result<(), hyper::Error> {
    tracing::debug!("Connection from {}", remote_addr);
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let router = router.clone();
        async move { Ok::<_, Infallible>(handle_request(&router, req).await) }
    });

    http1::Builder::new().serve_connection(io, service).await
}

/// Collects the body and hands the request to the router.
async fn handle_request(router: &RequestRouter, req: Request<Incoming>) -> HttpResponse {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    tracing::debug!("{} {}", parts.method, path);

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!("Failed to collect request body: {}", e);
            return plain_status(StatusCode::BAD_REQUEST);
        }
    };

    router.dispatch(parts.method, &path, parts.headers, body).await
}

fn plain_status(status: StatusCode) -> HttpResponse {
    http::Response::builder()
        .status(status)
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .unwrap_or_else(|_| http::Response::new(http_body_util::Full::new(bytes::Bytes::new())))
}
