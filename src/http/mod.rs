//! HTTP surface for module routers
//!
//! Each loaded module may contribute a [`ModuleRouter`]. The [`RouteTable`]
//! mounts them by prefix and [`WebServer`] serves the table over hyper.

pub mod routes;
pub mod server;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderMap, Method, Response, StatusCode};
use serde_json::{json, Value};

pub use routes::RouteTable;
pub use server::WebServer;

/// Response produced by a module router
pub type RouteResponse = Response<Bytes>;

/// A request as seen by a mounted router
///
/// `path` is relative to the mount point and always starts with `/`.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP handler a module mounts under its prefix
#[async_trait]
pub trait ModuleRouter: Send + Sync {
    async fn handle(&self, request: RouteRequest) -> RouteResponse;
}

/// JSON response with the given status
pub fn json_response(status: StatusCode, body: &Value) -> RouteResponse {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// `{"ok": .., "message": ..}` envelope used by the host and built-in routers
pub fn message_response(status: StatusCode, message: &str) -> RouteResponse {
    json_response(
        status,
        &json!({ "ok": status.is_success(), "message": message }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_envelope_tracks_status() {
        let response = message_response(StatusCode::NOT_FOUND, "Not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"ok": false, "message": "Not found"}));

        let ok = message_response(StatusCode::OK, "hi");
        let body: Value = serde_json::from_slice(ok.body()).unwrap();
        assert_eq!(body["ok"], true);
    }
}
