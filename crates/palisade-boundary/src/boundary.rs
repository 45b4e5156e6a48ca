//! The fault-isolation boundary.
//!
//! [`FaultBoundary::wrap`] preserves the `(request, response,
//! continuation)` calling convention exactly: the host invokes a wrapped
//! handler the same way it would invoke a raw one, and the handler runs
//! exactly once with no retries. What changes is what happens when the
//! handler faults; see the module docs in [`crate`].

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};

use palisade_core::{
    BoxHandler, ExecutionContext, Fault, Next, Request, RequestId, ResponseError, ResponseHandle,
    WorkerLifecycle,
};

use crate::kill::KillSwitch;
use crate::policy::DrainPolicy;
use crate::supervisor::{NoopSupervisor, Supervisor};

/// Fixed body of the best-effort failure response.
pub const INTERNAL_ERROR_BODY: &str = "An internal server error occurred!\n";

struct Inner {
    lifecycle: WorkerLifecycle,
    supervisor: Arc<dyn Supervisor>,
    policy: DrainPolicy,
    kill: KillSwitch,
}

/// Wraps handlers in an error-capturing context tied to the worker's
/// drain protocol.
///
/// # Example
///
/// ```rust
/// use palisade_boundary::FaultBoundary;
/// use palisade_core::{handler_fn, Next, Request, ResponseHandle};
///
/// let boundary = FaultBoundary::builder().build();
/// let wrapped = boundary.wrap(handler_fn(
///     |_req: Request, res: ResponseHandle, _next: Next| async move {
///         res.send("ok")?;
///         Ok(())
///     },
/// ));
/// ```
#[derive(Clone)]
pub struct FaultBoundary {
    inner: Arc<Inner>,
}

impl FaultBoundary {
    /// Creates a boundary builder.
    #[must_use]
    pub fn builder() -> FaultBoundaryBuilder {
        FaultBoundaryBuilder::default()
    }

    /// Returns the worker lifecycle this boundary drives.
    #[must_use]
    pub fn lifecycle(&self) -> &WorkerLifecycle {
        &self.inner.lifecycle
    }

    /// Returns the kill switch.
    #[must_use]
    pub fn kill_switch(&self) -> &KillSwitch {
        &self.inner.kill
    }

    /// Returns the drain policy.
    #[must_use]
    pub fn policy(&self) -> &DrainPolicy {
        &self.inner.policy
    }

    /// Returns a wrap function in the shape discovery-time binding
    /// expects.
    ///
    /// ```rust,ignore
    /// let wrap = boundary.wrapper();
    /// let map = discover("api/handlers", &registry, &wrap)?;
    /// ```
    pub fn wrapper(&self) -> impl Fn(BoxHandler) -> BoxHandler + '_ {
        move |handler| self.wrap(handler)
    }

    /// Wraps a raw handler in the fault-isolation boundary.
    ///
    /// The wrapped handler never resolves `Err`: a fault is consumed by
    /// the boundary and turned into the drain sequence plus a
    /// best-effort 500 for this request.
    #[must_use]
    pub fn wrap(&self, handler: BoxHandler) -> BoxHandler {
        let inner = Arc::clone(&self.inner);
        let wrapped: BoxHandler = Arc::new(move |mut req: Request, res: ResponseHandle, next: Next| {
            let inner = Arc::clone(&inner);
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let ctx = ExecutionContext::new();
                let scope = ctx.scope();
                req.attach(scope.clone());
                res.attach(scope);

                let request_id = req.id();
                let fut = handler(req, res.clone(), next.clone());
                if let Some(fault) = ctx.run(fut).await {
                    inner.handle_fault(request_id, &fault, &res, &next);
                }
                Ok(())
            })
        });
        wrapped
    }
}

impl std::fmt::Debug for FaultBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultBoundary")
            .field("lifecycle", &self.inner.lifecycle.state())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl Inner {
    /// Runs the fault sequence for one captured fault. Called at most
    /// once per execution context.
    fn handle_fault(&self, request_id: RequestId, fault: &Fault, res: &ResponseHandle, next: &Next) {
        tracing::error!(request_id = %request_id, error = %fault, "handler fault; rendering 500");
        tracing::error!(
            "worker will exit within {:?} to avoid leaking resources",
            self.policy.kill_after()
        );

        // Per faulting request, not just the first.
        self.kill.arm(self.policy.kill_after());

        if self.lifecycle.begin_drain() {
            self.supervisor.notify_will_disconnect();

            if self.policy.slow_disconnect() {
                // Keep taking connections for the grace window so more
                // in-flight work lands on a live worker.
                let supervisor = Arc::clone(&self.supervisor);
                let delay = self.policy.disconnect_delay();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    supervisor.disconnect();
                });
            } else {
                self.supervisor.disconnect();
            }
        }

        if let Err(err) = write_failure_response(res) {
            tracing::error!(request_id = %request_id, error = %err, "failed to send 500");
        }

        next.invoke();
    }
}

/// Best-effort 500. Fails (without panicking) when the response is
/// already sent or the connection is gone.
fn write_failure_response(res: &ResponseHandle) -> Result<(), ResponseError> {
    if res.is_sent() {
        return Err(ResponseError::AlreadySent);
    }
    res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    res.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    res.send(INTERNAL_ERROR_BODY)
}

/// Builder for [`FaultBoundary`].
#[derive(Default)]
pub struct FaultBoundaryBuilder {
    lifecycle: Option<WorkerLifecycle>,
    supervisor: Option<Arc<dyn Supervisor>>,
    policy: Option<DrainPolicy>,
    kill: Option<KillSwitch>,
}

impl FaultBoundaryBuilder {
    /// Uses an existing worker lifecycle (shared with the host).
    #[must_use]
    pub fn lifecycle(mut self, lifecycle: WorkerLifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Sets the supervisor link.
    #[must_use]
    pub fn supervisor(mut self, supervisor: Arc<dyn Supervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    /// Sets the drain policy.
    #[must_use]
    pub fn policy(mut self, policy: DrainPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Overrides the kill switch (tests inject a counting action here).
    #[must_use]
    pub fn kill_switch(mut self, kill: KillSwitch) -> Self {
        self.kill = Some(kill);
        self
    }

    /// Builds the boundary.
    #[must_use]
    pub fn build(self) -> FaultBoundary {
        FaultBoundary {
            inner: Arc::new(Inner {
                lifecycle: self.lifecycle.unwrap_or_default(),
                supervisor: self.supervisor.unwrap_or_else(|| Arc::new(NoopSupervisor)),
                policy: self.policy.unwrap_or_default(),
                kill: self.kill.unwrap_or_default(),
            }),
        }
    }
}

impl std::fmt::Debug for FaultBoundaryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultBoundaryBuilder")
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::{handler_fn, HandlerError, WorkerState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSupervisor {
        notified: AtomicUsize,
        disconnected: AtomicUsize,
    }

    impl Supervisor for RecordingSupervisor {
        fn notify_will_disconnect(&self) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }

        fn disconnect(&self) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_boundary(
        supervisor: Arc<RecordingSupervisor>,
        policy: DrainPolicy,
    ) -> FaultBoundary {
        FaultBoundary::builder()
            .supervisor(supervisor)
            .policy(policy)
            .kill_switch(KillSwitch::with_action(|| {}))
            .build()
    }

    fn ok_handler() -> BoxHandler {
        handler_fn(|_req: Request, res: ResponseHandle, _next: Next| async move {
            res.send("fine")?;
            Ok(())
        })
    }

    fn failing_handler() -> BoxHandler {
        handler_fn(|_req: Request, _res: ResponseHandle, _next: Next| async {
            Err(HandlerError::msg("boom"))
        })
    }

    fn panicking_handler() -> BoxHandler {
        handler_fn(|_req: Request, _res: ResponseHandle, _next: Next| async {
            panic!("unexpected")
        })
    }

    async fn invoke(
        wrapped: &BoxHandler,
    ) -> Result<palisade_core::FinishedResponse, tokio::sync::oneshot::error::RecvError> {
        let (res, rx) = ResponseHandle::channel();
        let req = Request::new(http::Method::GET, "/test");
        wrapped(req, res, Next::noop()).await.unwrap();
        rx.await
    }

    #[tokio::test]
    async fn test_clean_handler_untouched() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());
        let wrapped = boundary.wrap(ok_handler());

        let finished = invoke(&wrapped).await.unwrap();
        assert_eq!(finished.status, StatusCode::OK);
        assert_eq!(finished.body.as_ref(), b"fine");

        assert_eq!(boundary.lifecycle().state(), WorkerState::Active);
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 0);
        assert_eq!(supervisor.disconnected.load(Ordering::SeqCst), 0);
        assert_eq!(boundary.kill_switch().armed(), 0);
    }

    #[tokio::test]
    async fn test_error_return_renders_500_and_drains() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());
        let wrapped = boundary.wrap(failing_handler());

        let finished = invoke(&wrapped).await.unwrap();
        assert_eq!(finished.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            finished.headers.get(CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(finished.body.as_ref(), INTERNAL_ERROR_BODY.as_bytes());

        assert_eq!(boundary.lifecycle().state(), WorkerState::Draining);
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.disconnected.load(Ordering::SeqCst), 1);
        assert_eq!(boundary.kill_switch().armed(), 1);
    }

    #[tokio::test]
    async fn test_panic_contained() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());
        let wrapped = boundary.wrap(panicking_handler());

        let finished = invoke(&wrapped).await.unwrap();
        assert_eq!(finished.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(boundary.lifecycle().state(), WorkerState::Draining);
    }

    #[tokio::test]
    async fn test_async_fault_after_handler_returns() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());

        let wrapped = boundary.wrap(handler_fn(
            |req: Request, _res: ResponseHandle, _next: Next| async move {
                let scope = req.scope().cloned().expect("boundary attaches a scope");
                scope.spawn(async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err(HandlerError::msg("deferred failure"))
                });
                Ok(())
            },
        ));

        let finished = invoke(&wrapped).await.unwrap();
        assert_eq!(finished.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_continuation_invoked_on_fault() {
        let boundary = test_boundary(
            Arc::new(RecordingSupervisor::default()),
            DrainPolicy::new(),
        );
        let wrapped = boundary.wrap(failing_handler());

        let (res, _rx) = ResponseHandle::channel();
        let req = Request::new(http::Method::GET, "/test");
        let next = Next::noop();
        wrapped(req, res, next.clone()).await.unwrap();

        assert!(next.was_invoked());
    }

    #[tokio::test]
    async fn test_continuation_not_invoked_without_fault() {
        let boundary = test_boundary(
            Arc::new(RecordingSupervisor::default()),
            DrainPolicy::new(),
        );
        let wrapped = boundary.wrap(ok_handler());

        let (res, _rx) = ResponseHandle::channel();
        let req = Request::new(http::Method::GET, "/test");
        let next = Next::noop();
        wrapped(req, res, next.clone()).await.unwrap();

        assert!(!next.was_invoked());
    }

    #[tokio::test]
    async fn test_secondary_fault_swallowed() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());

        // The handler sends a success response and then faults; the 500
        // attempt finds the response already sent.
        let wrapped = boundary.wrap(handler_fn(
            |_req: Request, res: ResponseHandle, _next: Next| async move {
                res.send("too late to unsend")?;
                Err(HandlerError::msg("fault after send"))
            },
        ));

        let finished = invoke(&wrapped).await.unwrap();
        assert_eq!(finished.status, StatusCode::OK);
        assert_eq!(finished.body.as_ref(), b"too late to unsend");

        // The drain still happened exactly once.
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 1);
        assert_eq!(boundary.kill_switch().armed(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_faults_single_drain() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(Arc::clone(&supervisor), DrainPolicy::new());
        let wrapped = boundary.wrap(failing_handler());

        let mut invocations = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let wrapped = Arc::clone(&wrapped);
            invocations.spawn(async move {
                let (res, rx) = ResponseHandle::channel();
                let req = Request::new(http::Method::GET, "/test");
                wrapped(req, res, Next::noop()).await.unwrap();
                rx.await.unwrap()
            });
        }

        // Every request got its own 500 and armed its own timer...
        let mut count = 0;
        while let Some(finished) = invocations.join_next().await {
            assert_eq!(
                finished.unwrap().status,
                StatusCode::INTERNAL_SERVER_ERROR
            );
            count += 1;
        }
        assert_eq!(count, 8);
        assert_eq!(boundary.kill_switch().armed(), 8);

        // ...but the drain sequence ran exactly once.
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_disconnect_waits_for_grace_window() {
        let supervisor = Arc::new(RecordingSupervisor::default());
        let boundary = test_boundary(
            Arc::clone(&supervisor),
            DrainPolicy::new()
                .with_slow_disconnect(true)
                .with_disconnect_delay(Duration::from_millis(50)),
        );
        let wrapped = boundary.wrap(failing_handler());

        invoke(&wrapped).await.unwrap();

        // Notification is immediate, disconnect is not.
        assert_eq!(supervisor.notified.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.disconnected.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(supervisor.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kill_timer_terminates() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let boundary = FaultBoundary::builder()
            .policy(DrainPolicy::new().with_kill_after(Duration::from_millis(20)))
            .kill_switch(KillSwitch::with_action(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build();
        let wrapped = boundary.wrap(failing_handler());

        invoke(&wrapped).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
