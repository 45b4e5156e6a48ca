//! The handler calling convention.
//!
//! Every bound operation, route verb or helper export alike, is a
//! [`BoxHandler`]: an async function over `(Request, ResponseHandle,
//! Next)`. The isolation boundary wraps handlers without changing this
//! shape, so the host invokes a wrapped handler exactly as it would an
//! unwrapped one.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::ResponseHandle;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A type-erased handler sharing the `(request, response, continuation)`
/// calling convention.
pub type BoxHandler = Arc<dyn Fn(Request, ResponseHandle, Next) -> HandlerFuture + Send + Sync>;

/// Converts an async function into a [`BoxHandler`].
///
/// # Example
///
/// ```rust
/// use palisade_core::{handler_fn, Next, Request, ResponseHandle};
///
/// let handler = handler_fn(|_req: Request, res: ResponseHandle, _next: Next| async move {
///     res.send("hello")?;
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Request, ResponseHandle, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    let erased: BoxHandler = Arc::new(move |req, res, next| Box::pin(f(req, res, next)));
    erased
}

struct NextInner {
    invoked: AtomicBool,
    hook: Box<dyn Fn() + Send + Sync>,
}

/// The framework continuation passed to every handler.
///
/// `Next` is cloneable so the boundary can hold it across the handler
/// call, but it fires at most once no matter how many clones invoke it:
/// the usual middleware contract.
#[derive(Clone)]
pub struct Next {
    inner: Arc<NextInner>,
}

impl Next {
    /// Creates a continuation around the given hook.
    #[must_use]
    pub fn new(hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(NextInner {
                invoked: AtomicBool::new(false),
                hook: Box::new(hook),
            }),
        }
    }

    /// A continuation that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Invokes the continuation. Subsequent calls are no-ops.
    pub fn invoke(&self) {
        if self
            .inner
            .invoked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            (self.inner.hook)();
        }
    }

    /// Returns `true` if the continuation has been invoked.
    #[must_use]
    pub fn was_invoked(&self) -> bool {
        self.inner.invoked.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("invoked", &self.was_invoked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_handler_fn_invocation() {
        let handler = handler_fn(|req: Request, res: ResponseHandle, _next: Next| async move {
            res.send(format!("saw {}", req.path()))?;
            Ok(())
        });

        let (res, rx) = ResponseHandle::channel();
        let req = Request::new(Method::GET, "/ping");
        handler(req, res, Next::noop()).await.unwrap();

        assert_eq!(rx.await.unwrap().body.as_ref(), b"saw /ping");
    }

    #[test]
    fn test_next_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let next = Next::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!next.was_invoked());
        next.invoke();
        next.invoke();
        next.clone().invoke();

        assert!(next.was_invoked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_next_noop() {
        let next = Next::noop();
        next.invoke();
        assert!(next.was_invoked());
    }
}
