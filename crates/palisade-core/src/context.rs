//! Per-request execution context.
//!
//! An [`ExecutionContext`] is created for one handler invocation and owns
//! that invocation's two participants, the request and the response,
//! for its duration. The context captures at most one [`Fault`], whether
//! it surfaces synchronously from the handler body or later from
//! asynchronous work the handler scheduled through its [`ScopeHandle`].
//! Work scheduled in one context is never attributed to another: each
//! scope carries its own fault channel, so an error that fires after a
//! suspension still lands in the context that scheduled it.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{mpsc, Notify};

use crate::error::{Fault, HandlerError};
use crate::handler::HandlerFuture;

/// Counter for asynchronous tasks scheduled within one context.
#[derive(Clone)]
struct TaskSet {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl TaskSet {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    fn enter(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Waits until no scheduled tasks remain.
    async fn idle(&self) {
        loop {
            // Register interest before checking the count, so a task that
            // exits between the check and the await still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Handle for scheduling asynchronous work attributed to one context.
///
/// Cloneable; every clone reports into the same context. Obtained from
/// [`ExecutionContext::scope`] and reachable from an attached request via
/// [`Request::scope`](crate::Request::scope).
#[derive(Clone)]
pub struct ScopeHandle {
    faults: mpsc::UnboundedSender<Fault>,
    tasks: TaskSet,
}

impl ScopeHandle {
    /// Schedules asynchronous work within this context.
    ///
    /// The task's `Err` return or panic is routed to the context's fault
    /// channel. The context does not conclude until all scheduled tasks
    /// have finished or its single fault has been delivered.
    pub fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.tasks.enter();
        let scope = self.clone();
        tokio::spawn(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => scope.report(Fault::Error(err)),
                Err(payload) => scope.report(Fault::from_panic(payload.as_ref())),
            }
            scope.tasks.exit();
        });
    }

    /// Reports a fault directly into the context.
    ///
    /// Delivery after the context has already captured its fault is
    /// silently dropped; a context delivers at most one.
    pub fn report(&self, fault: Fault) {
        if self.faults.send(fault).is_err() {
            tracing::debug!("fault reported after context concluded; dropped");
        }
    }
}

impl std::fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("active_tasks", &self.tasks.active.load(Ordering::SeqCst))
            .finish()
    }
}

/// Error-capturing scope for a single handler invocation.
///
/// # Example
///
/// ```rust
/// use palisade_core::{ExecutionContext, HandlerError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = ExecutionContext::new();
/// let fault = ctx
///     .run(Box::pin(async { Err(HandlerError::msg("boom")) }))
///     .await;
/// assert!(fault.is_some());
/// # }
/// ```
pub struct ExecutionContext {
    faults_tx: mpsc::UnboundedSender<Fault>,
    faults_rx: mpsc::UnboundedReceiver<Fault>,
    tasks: TaskSet,
}

impl ExecutionContext {
    /// Creates a fresh context.
    #[must_use]
    pub fn new() -> Self {
        let (faults_tx, faults_rx) = mpsc::unbounded_channel();
        Self {
            faults_tx,
            faults_rx,
            tasks: TaskSet::new(),
        }
    }

    /// Returns a handle for attributing asynchronous work to this context.
    #[must_use]
    pub fn scope(&self) -> ScopeHandle {
        ScopeHandle {
            faults: self.faults_tx.clone(),
            tasks: self.tasks.clone(),
        }
    }

    /// Drives the handler future to its conclusion inside this context.
    ///
    /// Resolves `None` when the handler and every task it scheduled
    /// completed cleanly. Resolves `Some(fault)` as soon as the first
    /// fault is captured: from the handler's `Err` return, a panic in
    /// the handler body, or a scheduled task. Later faults from the same
    /// context are dropped.
    pub async fn run(self, handler: HandlerFuture) -> Option<Fault> {
        let Self {
            faults_tx,
            mut faults_rx,
            tasks,
        } = self;
        // Only scope handles keep the channel open from here on.
        drop(faults_tx);

        let completion = async {
            match AssertUnwindSafe(handler).catch_unwind().await {
                Ok(Ok(())) => {
                    tasks.idle().await;
                    None
                }
                Ok(Err(err)) => Some(Fault::Error(err)),
                Err(payload) => Some(Fault::from_panic(payload.as_ref())),
            }
        };
        tokio::pin!(completion);

        tokio::select! {
            Some(fault) = faults_rx.recv() => Some(fault),
            outcome = &mut completion => outcome,
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("active_tasks", &self.tasks.active.load(Ordering::SeqCst))
            .finish()
    }
}
