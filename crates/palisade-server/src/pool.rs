//! Worker side of the supervised process pool.
//!
//! The pool manager owns the shared listening channel and redistributes
//! it across workers; this module is the worker's link to it.
//! [`PoolLink`] implements [`Supervisor`]: drain notifications go out as
//! [`WorkerMessage`]s on the control channel, and `disconnect` trips the
//! worker's [`ShutdownSignal`] so the accept loop detaches from the
//! listener while in-flight connections finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use palisade_boundary::Supervisor;

use crate::shutdown::ShutdownSignal;

/// Control messages a worker sends to its pool manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMessage {
    /// The worker is about to disconnect from the shared listener.
    WillDisconnect,
}

/// The worker's link to the supervising pool.
///
/// # Example
///
/// ```rust
/// use palisade_boundary::Supervisor;
/// use palisade_server::{PoolLink, ShutdownSignal, WorkerMessage};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let shutdown = ShutdownSignal::new();
/// let (link, mut messages) = PoolLink::new(shutdown.clone());
///
/// link.notify_will_disconnect();
/// link.disconnect();
///
/// assert_eq!(messages.recv().await, Some(WorkerMessage::WillDisconnect));
/// assert!(shutdown.is_shutdown());
/// # }
/// ```
#[derive(Debug)]
pub struct PoolLink {
    messages: mpsc::UnboundedSender<WorkerMessage>,
    shutdown: ShutdownSignal,
    drain_flagged: Arc<AtomicBool>,
}

impl PoolLink {
    /// Creates a link around the worker's shutdown signal.
    ///
    /// Returns the receiving end of the control channel; in a real pool
    /// that end lives in the manager process, in tests it lets the drain
    /// notification be observed.
    #[must_use]
    pub fn new(shutdown: ShutdownSignal) -> (Self, mpsc::UnboundedReceiver<WorkerMessage>) {
        let (messages, receiver) = mpsc::unbounded_channel();
        (
            Self {
                messages,
                shutdown,
                drain_flagged: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        )
    }

    /// Returns the worker's shutdown signal.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Returns `true` once this worker has announced its drain.
    #[must_use]
    pub fn drain_flagged(&self) -> bool {
        self.drain_flagged.load(Ordering::SeqCst)
    }
}

impl Supervisor for PoolLink {
    fn notify_will_disconnect(&self) {
        self.drain_flagged.store(true, Ordering::SeqCst);
        if self.messages.send(WorkerMessage::WillDisconnect).is_err() {
            tracing::warn!("pool manager is gone; drain notification dropped");
        }
    }

    fn disconnect(&self) {
        tracing::info!("disconnecting from shared listener");
        self.shutdown.trigger();
    }
}
