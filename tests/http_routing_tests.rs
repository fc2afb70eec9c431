//! Module routers mounted from a started host

mod common;

use async_trait::async_trait;
use common::*;
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use modhost::http::{json_response, ModuleRouter, RouteRequest, RouteResponse, RouteTable};
use modhost::module::{ModuleHost, ModuleManager, ModuleManifest, ModuleSource};
use modhost::settings::{MemoryTenantDirectory, SettingsModule};
use modhost::storage::MemorySettingsStore;

/// Router that reports which module answered and the relative path
struct Whoami(&'static str);

#[async_trait]
impl ModuleRouter for Whoami {
    async fn handle(&self, request: RouteRequest) -> RouteResponse {
        json_response(StatusCode::OK, &json!({ "module": self.0, "path": request.path }))
    }
}

fn with_router(manifest: ModuleManifest, name: &'static str) -> Box<dyn ModuleSource> {
    let id = manifest.id.clone();
    source_with(&id, move |d| {
        let mut d = d.with_router(Whoami(name));
        d.manifest = manifest.clone();
        d
    })
}

async fn host() -> ModuleHost {
    let settings: Box<dyn ModuleSource> = Box::new(SettingsModule::new(
        Arc::new(MemorySettingsStore::new()),
        Arc::new(MemoryTenantDirectory::new()),
    ));
    ModuleManager::new(vec![
        settings,
        with_router(ModuleManifest::new("tickets"), "tickets"),
        with_router(
            ModuleManifest::new("commissions").with_router_prefix("/api/commissions/"),
            "commissions",
        ),
        // same mount point as `tickets`, loses
        with_router(
            ModuleManifest::new("helpdesk").with_router_prefix("tickets"),
            "helpdesk",
        ),
        // disabled modules never mount
        with_router(ModuleManifest::new("ghost").depends_on("missing"), "ghost"),
    ])
    .start()
    .await
    .unwrap()
}

fn body(response: &RouteResponse) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

async fn get(table: &RouteTable, path: &str) -> RouteResponse {
    table.route(true, RouteRequest::new(Method::GET, path)).await
}

#[tokio::test]
async fn prefixes_fall_back_to_module_id() {
    let host = host().await;
    let table = RouteTable::from_modules(&host.modules());

    let mut prefixes = table.prefixes();
    prefixes.sort();
    assert_eq!(prefixes, vec!["/api/commissions", "/settings", "/tickets"]);
}

#[tokio::test]
async fn requests_reach_the_owning_module() {
    let host = host().await;
    let table = RouteTable::from_modules(&host.modules());

    let response = get(&table, "/settings").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body(&response),
        json!({ "ok": true, "message": "Welcome to the settings module!" })
    );

    let response = get(&table, "/tickets/42/close").await;
    assert_eq!(body(&response), json!({ "module": "tickets", "path": "/42/close" }));

    let response = get(&table, "/api/commissions").await;
    assert_eq!(body(&response), json!({ "module": "commissions", "path": "/" }));
}

#[tokio::test]
async fn unmatched_paths_are_not_found() {
    let host = host().await;
    let table = RouteTable::from_modules(&host.modules());

    for path in ["/", "/ghost", "/ticketsx", "/api"] {
        let response = get(&table, path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        assert_eq!(body(&response), json!({ "ok": false, "message": "Not found" }));
    }

    let response = get(&table, "/settings/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn not_ready_means_service_unavailable() {
    let host = host().await;
    let table = RouteTable::from_modules(&host.modules());

    let response = table
        .route(false, RouteRequest::new(Method::GET, "/settings"))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body(&response), json!({ "ok": false, "message": "Not ready" }));
}
