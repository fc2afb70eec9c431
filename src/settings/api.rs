//! HTTP router for the settings module

use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::http::{message_response, ModuleRouter, RouteRequest, RouteResponse};

pub struct SettingsRouter;

#[async_trait]
impl ModuleRouter for SettingsRouter {
    async fn handle(&self, request: RouteRequest) -> RouteResponse {
        match (&request.method, request.path.as_str()) {
            (&Method::GET, "/") => {
                message_response(StatusCode::OK, "Welcome to the settings module!")
            }
            _ => message_response(StatusCode::NOT_FOUND, "Not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn root_welcomes() {
        let response = SettingsRouter
            .handle(RouteRequest::new(Method::GET, "/"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(
            body,
            json!({"ok": true, "message": "Welcome to the settings module!"})
        );
    }

    #[tokio::test]
    async fn other_paths_are_404() {
        let response = SettingsRouter
            .handle(RouteRequest::new(Method::POST, "/"))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
