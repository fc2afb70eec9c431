//! Prefix routing table
//!
//! Resolution is pure so it can be tested without a socket.

use http::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{message_response, ModuleRouter, RouteRequest, RouteResponse};
use crate::module::loader::LoadedModuleSet;

struct Mount {
    prefix: String,
    module_id: String,
    router: Arc<dyn ModuleRouter>,
}

/// Module routers keyed by mount prefix
#[derive(Default)]
pub struct RouteTable {
    /// Longest prefix first
    mounts: Vec<Mount>,
}

/// Normalise a mount prefix to `/segment[/segment..]` with no trailing slash
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount every loaded module that has a router, in load order
    pub fn from_modules(modules: &LoadedModuleSet) -> Self {
        let mut table = Self::new();
        for module in modules.iter() {
            if let Some(router) = &module.router {
                table.mount(module.mount_prefix(), module.id(), Arc::clone(router));
            }
        }
        table
    }

    /// Mount a router. A prefix already taken keeps its first owner.
    pub fn mount(
        &mut self,
        prefix: &str,
        module_id: &str,
        router: Arc<dyn ModuleRouter>,
    ) -> bool {
        let prefix = normalize_prefix(prefix);
        if let Some(existing) = self.mounts.iter().find(|m| m.prefix == prefix) {
            warn!(
                "Module '{}' tried to mount its router at '{}', already used by module '{}'. Ignoring.",
                module_id, prefix, existing.module_id
            );
            return false;
        }
        debug!("Mounting router of module '{}' at '{}'", module_id, prefix);
        self.mounts.push(Mount {
            prefix,
            module_id: module_id.to_string(),
            router,
        });
        self.mounts
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        true
    }

    /// Mounted prefixes, longest first
    pub fn prefixes(&self) -> Vec<&str> {
        self.mounts.iter().map(|m| m.prefix.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Find the router for `path` and the path relative to its mount point
    pub fn resolve(&self, path: &str) -> Option<(&str, Arc<dyn ModuleRouter>, String)> {
        self.mounts.iter().find_map(|mount| {
            let rest = strip_mount(&mount.prefix, path)?;
            Some((
                mount.module_id.as_str(),
                Arc::clone(&mount.router),
                rest,
            ))
        })
    }

    /// Route a request, answering 503 until the host is ready
    pub async fn route(&self, ready: bool, mut request: RouteRequest) -> RouteResponse {
        if !ready {
            return message_response(StatusCode::SERVICE_UNAVAILABLE, "Not ready");
        }
        match self.resolve(&request.path) {
            Some((module_id, router, rest)) => {
                debug!("{} {} -> module '{}'", request.method, request.path, module_id);
                request.path = rest;
                router.handle(request).await
            }
            None => message_response(StatusCode::NOT_FOUND, "Not found"),
        }
    }
}

/// Match on whole path segments only, so `/settings` does not claim `/settingsx`
fn strip_mount(prefix: &str, path: &str) -> Option<String> {
    if prefix == "/" {
        return Some(if path.is_empty() { "/".to_string() } else { path.to_string() });
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}
