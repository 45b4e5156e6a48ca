//! Response handle.
//!
//! [`ResponseHandle`] is the outbound half of the request/response pair.
//! It exposes a mutable status code, settable headers, and a terminal
//! [`send`](ResponseHandle::send) operation that delivers the finished
//! response to the connection side and closes the exchange. Sending twice,
//! or sending after the connection went away, returns a [`ResponseError`]
//! instead of panicking; the isolation boundary relies on that for its
//! best-effort 500 path.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::context::ScopeHandle;
use crate::error::ResponseError;

/// A fully materialized response, as received by the connection side.
#[derive(Debug)]
pub struct FinishedResponse {
    /// Final status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

struct Inner {
    status: StatusCode,
    headers: HeaderMap,
    sent: bool,
    tx: Option<oneshot::Sender<FinishedResponse>>,
    scope: Option<ScopeHandle>,
}

/// A cloneable handle to an in-flight response.
///
/// All clones share the same underlying state; the first successful
/// [`send`](ResponseHandle::send) wins.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use palisade_core::ResponseHandle;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (res, rx) = ResponseHandle::channel();
/// res.set_status(StatusCode::CREATED);
/// res.send("done").unwrap();
///
/// let finished = rx.await.unwrap();
/// assert_eq!(finished.status, StatusCode::CREATED);
/// assert_eq!(finished.body.as_ref(), b"done");
/// # }
/// ```
#[derive(Clone)]
pub struct ResponseHandle {
    inner: Arc<Mutex<Inner>>,
}

impl ResponseHandle {
    /// Creates a response handle and the receiver the connection side
    /// awaits for the finished response.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<FinishedResponse>) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            inner: Arc::new(Mutex::new(Inner {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                sent: false,
                tx: Some(tx),
                scope: None,
            })),
        };
        (handle, rx)
    }

    /// Sets the status code. Ignored once the response has been sent.
    pub fn set_status(&self, status: StatusCode) {
        let mut inner = self.inner.lock();
        if !inner.sent {
            inner.status = status;
        }
    }

    /// Returns the current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.lock().status
    }

    /// Sets a header. Ignored once the response has been sent.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        let mut inner = self.inner.lock();
        if !inner.sent {
            inner.headers.insert(name, value);
        }
    }

    /// Returns `true` if the response has been sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.inner.lock().sent
    }

    /// Sends the body and closes the response.
    ///
    /// This is terminal: the status and headers captured at this point are
    /// what the connection side receives.
    ///
    /// # Errors
    ///
    /// - [`ResponseError::AlreadySent`] if the response was already sent.
    /// - [`ResponseError::Disconnected`] if the connection side dropped
    ///   the receiver. The response is still marked sent.
    pub fn send(&self, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        let mut inner = self.inner.lock();
        if inner.sent {
            return Err(ResponseError::AlreadySent);
        }
        inner.sent = true;

        let tx = inner.tx.take().ok_or(ResponseError::AlreadySent)?;
        let finished = FinishedResponse {
            status: inner.status,
            headers: inner.headers.clone(),
            body: body.into(),
        };
        tx.send(finished).map_err(|_| ResponseError::Disconnected)
    }

    /// Attaches this response to an execution context.
    pub fn attach(&self, scope: ScopeHandle) {
        self.inner.lock().scope = Some(scope);
    }

    /// Returns the attached execution-context scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<ScopeHandle> {
        self.inner.lock().scope.clone()
    }
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResponseHandle")
            .field("status", &inner.status)
            .field("sent", &inner.sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_status_headers_body() {
        let (res, rx) = ResponseHandle::channel();
        res.set_status(StatusCode::NOT_FOUND);
        res.set_header(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        );
        res.send("missing").unwrap();

        let finished = rx.await.unwrap();
        assert_eq!(finished.status, StatusCode::NOT_FOUND);
        assert_eq!(
            finished.headers.get(http::header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(finished.body.as_ref(), b"missing");
    }

    #[tokio::test]
    async fn test_double_send_fails() {
        let (res, _rx) = ResponseHandle::channel();
        res.send("first").unwrap();
        assert_eq!(res.send("second"), Err(ResponseError::AlreadySent));
    }

    #[tokio::test]
    async fn test_send_after_disconnect_fails() {
        let (res, rx) = ResponseHandle::channel();
        drop(rx);
        assert_eq!(res.send("late"), Err(ResponseError::Disconnected));
        // The attempt was terminal either way.
        assert!(res.is_sent());
    }

    #[tokio::test]
    async fn test_mutations_after_send_are_ignored() {
        let (res, rx) = ResponseHandle::channel();
        res.send("body").unwrap();

        res.set_status(StatusCode::IM_A_TEAPOT);
        res.set_header(http::header::ACCEPT, HeaderValue::from_static("x"));

        let finished = rx.await.unwrap();
        assert_eq!(finished.status, StatusCode::OK);
        assert!(finished.headers.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (res, rx) = ResponseHandle::channel();
        let clone = res.clone();
        clone.set_status(StatusCode::ACCEPTED);
        res.send("ok").unwrap();

        assert!(clone.is_sent());
        assert_eq!(rx.await.unwrap().status, StatusCode::ACCEPTED);
    }
}
