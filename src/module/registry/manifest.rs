//! Module manifest and descriptor
//!
//! The manifest is the declarative half of a module (id, dependencies,
//! router prefix) and can be written as TOML. The descriptor bundles the
//! manifest with the capabilities, actions and router the module contributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::http::ModuleRouter;
use crate::module::api::actions::Action;
use crate::module::capability::{Command, Component, Event};
use crate::module::traits::ModuleError;

/// Module manifest (`module.toml` structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module id (unique across the host)
    #[serde(default)]
    pub id: String,
    /// Whether the module should be loaded at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ids of modules that must be loaded before this one
    #[serde(default)]
    pub depends: Vec<String>,
    /// Module version (semantic versioning)
    #[serde(default)]
    pub version: Option<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Mount prefix for the module's HTTP router (defaults to the id)
    #[serde(default)]
    pub router_prefix: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ModuleManifest {
    /// Minimal manifest with just an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            depends: Vec::new(),
            version: None,
            description: None,
            router_prefix: None,
        }
    }

    /// Parse a manifest from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })
    }

    /// Add a dependency
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends.push(id.into());
        self
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the router mount prefix
    pub fn with_router_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.router_prefix = Some(prefix.into());
        self
    }

    /// Set the version string
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Everything a module contributes to the host
pub struct ModuleDescriptor {
    /// Declarative manifest
    pub manifest: ModuleManifest,
    /// Command handlers
    pub commands: Vec<Arc<dyn Command>>,
    /// Gateway event handlers
    pub events: Vec<Arc<dyn Event>>,
    /// Component interaction handlers
    pub components: Vec<Arc<dyn Component>>,
    /// Cross-module actions keyed by action id
    pub actions: HashMap<String, Action>,
    /// Optional HTTP router
    pub router: Option<Arc<dyn ModuleRouter>>,
}

impl ModuleDescriptor {
    /// Descriptor with no capabilities
    pub fn new(manifest: ModuleManifest) -> Self {
        Self {
            manifest,
            commands: Vec::new(),
            events: Vec::new(),
            components: Vec::new(),
            actions: HashMap::new(),
            router: None,
        }
    }

    /// Module id
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Whether the module is currently enabled
    pub fn enabled(&self) -> bool {
        self.manifest.enabled
    }

    /// Declared dependencies
    pub fn depends(&self) -> &[String] {
        &self.manifest.depends
    }

    /// Where the HTTP router is mounted: the prefix if set, the id otherwise
    pub fn mount_prefix(&self) -> &str {
        self.manifest
            .router_prefix
            .as_deref()
            .unwrap_or(&self.manifest.id)
    }

    pub fn with_command(mut self, command: impl Command + 'static) -> Self {
        self.commands.push(Arc::new(command));
        self
    }

    pub fn with_event(mut self, event: impl Event + 'static) -> Self {
        self.events.push(Arc::new(event));
        self
    }

    pub fn with_component(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    pub fn with_action(mut self, action_id: impl Into<String>, action: Action) -> Self {
        self.actions.insert(action_id.into(), action);
        self
    }

    pub fn with_router(mut self, router: impl ModuleRouter + 'static) -> Self {
        self.router = Some(Arc::new(router));
        self
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&String> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("ModuleDescriptor")
            .field("manifest", &self.manifest)
            .field(
                "commands",
                &self.commands.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field(
                "events",
                &self.events.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field(
                "components",
                &self.components.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("actions", &actions)
            .field("router", &self.router.is_some())
            .finish()
    }
}
