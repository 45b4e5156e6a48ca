//! Request-to-handler routing glue.
//!
//! Routing over a discovered tree is a plain lookup: split the URL path
//! into segments, descend the nested map, and dispatch on the `$method`
//! key of the resolved group. There is no pattern matching here; the
//! tree's shape is the route table.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, Method, Response, StatusCode};
use http_body_util::Full;

use palisade_core::{BoxHandler, FinishedResponse, Next, Request, ResponseHandle};
use palisade_discovery::HandlerMap;

/// Type alias for the HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Routes incoming requests through a discovered handler tree.
///
/// The tree is immutable after startup, so the router is freely
/// shareable across connections.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    map: Arc<HandlerMap>,
}

impl RequestRouter {
    /// Creates a router over a discovered tree.
    #[must_use]
    pub fn new(map: HandlerMap) -> Self {
        Self { map: Arc::new(map) }
    }

    /// Returns the underlying handler tree.
    #[must_use]
    pub fn map(&self) -> &HandlerMap {
        &self.map
    }

    /// Dispatches one request and materializes its response.
    pub async fn dispatch(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> HttpResponse {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let Some(group) = self.map.resolve(&segments) else {
            return not_found(path);
        };

        let Some(handler) = group.get_method(&method) else {
            return method_not_allowed(&group.allowed_methods());
        };

        invoke(handler, method, path, headers, body).await
    }
}

/// Invokes one bound handler and awaits its finished response.
async fn invoke(
    handler: &BoxHandler,
    method: Method,
    path: &str,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResponse {
    let (res, rx) = ResponseHandle::channel();
    let req = Request::new(method, path)
        .with_headers(headers)
        .with_body(body);
    let next = Next::new(|| tracing::trace!("continuation reached host pipeline"));

    if let Err(err) = handler(req, res.clone(), next).await {
        // Wrapped handlers never resolve Err; a raw handler mounted
        // directly can.
        tracing::error!(error = %err, "handler resolved with an error");
    }

    // Release our clone so an unsent response surfaces as a closed
    // channel instead of a hang.
    drop(res);

    match rx.await {
        Ok(finished) => into_http(finished),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "NO_RESPONSE",
            "Handler completed without producing a response",
        ),
    }
}

/// Converts a finished response into the hyper representation.
fn into_http(finished: FinishedResponse) -> HttpResponse {
    let mut builder = Response::builder().status(finished.status);
    for (name, value) in &finished.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Full::new(finished.body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Builds a standard JSON error response.
fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn not_found(path: &str) -> HttpResponse {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn method_not_allowed(allowed: &[Method]) -> HttpResponse {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let body = serde_json::json!({
        "error": "Method Not Allowed",
        "allow": allow
    });

    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, allow.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use palisade_core::handler_fn;
    use palisade_discovery::{HandlerGroup, HandlerNode};

    fn echo_path_handler() -> BoxHandler {
        handler_fn(|req: Request, res: ResponseHandle, _next: Next| async move {
            res.send(format!("path={}", req.path()))?;
            Ok(())
        })
    }

    fn silent_handler() -> BoxHandler {
        handler_fn(|_req: Request, _res: ResponseHandle, _next: Next| async { Ok(()) })
    }

    fn test_map() -> HandlerMap {
        let mut users = HandlerGroup::new();
        users.insert("$get", echo_path_handler());
        users.insert("$post", echo_path_handler());
        users.insert("helper", echo_path_handler());

        let mut reports = HandlerGroup::new();
        reports.insert("$get", echo_path_handler());

        let mut admin = HandlerMap::new();
        admin.insert("reports", HandlerNode::Group(reports));

        let mut map = HandlerMap::new();
        map.insert("users", HandlerNode::Group(users));
        map.insert("admin", HandlerNode::Nested(admin));
        map
    }

    async fn body_text(response: HttpResponse) -> String {
        let collected = response.into_body().collect().await.unwrap();
        String::from_utf8(collected.to_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_flat_route() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::GET, "/users", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "path=/users");
    }

    #[tokio::test]
    async fn test_dispatch_nested_route() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::GET, "/admin/reports", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::GET, "/ghosts", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nested_map_itself_is_404() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::GET, "/admin", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unbound_method_is_405_with_allow() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::DELETE, "/users", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers().get(ALLOW).unwrap().to_str().unwrap();
        assert!(allow.contains("GET"));
        assert!(allow.contains("POST"));
        assert!(!allow.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_root_path_is_404() {
        let router = RequestRouter::new(test_map());
        let response = router
            .dispatch(Method::GET, "/", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_without_response_is_500() {
        let mut group = HandlerGroup::new();
        group.insert("$get", silent_handler());
        let mut map = HandlerMap::new();
        map.insert("quiet", HandlerNode::Group(group));

        let router = RequestRouter::new(map);
        let response = router
            .dispatch(Method::GET, "/quiet", HeaderMap::new(), Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
