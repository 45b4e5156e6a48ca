//! Request types.
//!
//! [`Request`] is the inbound half of the pair a handler operates on. It
//! carries the parsed method, path, headers, collected body bytes, and a
//! time-ordered [`RequestId`] for log correlation. A request can be
//! attached to an execution context via [`Request::attach`], which makes
//! the context's [`ScopeHandle`] reachable from the handler.

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ScopeHandle;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inbound request as seen by a bound handler.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use palisade_core::Request;
///
/// let req = Request::new(Method::GET, "/users").with_body("{}");
/// assert_eq!(req.path(), "/users");
/// assert_eq!(req.method(), &Method::GET);
/// ```
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    scope: Option<ScopeHandle>,
}

impl Request {
    /// Creates a new request with an empty body and no headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            scope: None,
        }
    }

    /// Replaces the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Replaces the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URL path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the collected body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Attaches this request to an execution context.
    ///
    /// After attachment, [`Request::scope`] exposes the context's
    /// [`ScopeHandle`], letting the handler schedule asynchronous work
    /// whose failures are attributed to this request's context.
    pub fn attach(&mut self, scope: ScopeHandle) {
        self.scope = Some(scope);
    }

    /// Returns the attached execution-context scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&ScopeHandle> {
        self.scope.as_ref()
    }
}
