//! Module manager for orchestrating all modules
//!
//! Drives the host through discovery, dependency resolution, registration
//! and sequential initialization, publishing each lifecycle state on a watch
//! channel. The result is a read-only [`ModuleHost`].

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::ModuleConfig;
use crate::module::api::actions::ActionRegistry;
use crate::module::capability::{CommandRegistry, ComponentRegistry, EventRegistry};
use crate::module::loader::{LoadedModuleSet, ModuleLoader};
use crate::module::registry::dependencies::{
    DependencyResolution, DisableReason, ModuleDependencies, ResolveOptions,
};
use crate::module::registry::discovery::{ModuleDiscovery, SkippedCandidate};
use crate::module::traits::{LifecycleState, ModuleError, ModuleSource};

/// A module left out of the load order, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledEntry {
    pub id: String,
    pub reason: DisableReason,
}

/// Discovery and resolution outcome, without running anything
#[derive(Debug)]
pub struct LoadPlan {
    pub skipped: Vec<SkippedCandidate>,
    pub resolution: DependencyResolution,
}

impl LoadPlan {
    pub fn load_order(&self) -> Vec<&str> {
        self.resolution.load_order()
    }

    pub fn disabled(&self) -> Vec<DisabledEntry> {
        self.resolution
            .disabled
            .iter()
            .map(|d| DisabledEntry {
                id: d.id().to_string(),
                reason: d.reason.clone(),
            })
            .collect()
    }
}

/// Module manager coordinates startup of all modules
pub struct ModuleManager {
    sources: Vec<Box<dyn ModuleSource>>,
    options: ResolveOptions,
    module_configs: HashMap<String, HashMap<String, String>>,
    state: LifecycleState,
    state_tx: watch::Sender<LifecycleState>,
}

impl ModuleManager {
    /// Create a manager over a static registration list
    pub fn new(sources: Vec<Box<dyn ModuleSource>>) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Pending);
        Self {
            sources,
            options: ResolveOptions::default(),
            module_configs: HashMap::new(),
            state: LifecycleState::Pending,
            state_tx,
        }
    }

    /// Apply enable/disable overrides and per-module config
    pub fn with_config(mut self, config: &ModuleConfig) -> Self {
        self.options = config.resolve_options();
        self.module_configs = config.module_configs.clone();
        self
    }

    /// Subscribe to lifecycle state changes
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    fn advance(&mut self, to: LifecycleState) -> Result<(), ModuleError> {
        if self.state.next() != Some(to) {
            return Err(ModuleError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        info!("Module host: {} -> {}", self.state, to);
        self.state = to;
        self.state_tx.send_replace(to);
        Ok(())
    }

    /// Discover and resolve without registering or initializing anything
    pub fn plan(self) -> Result<LoadPlan, ModuleError> {
        let discovered = ModuleDiscovery::new(self.sources).discover_modules()?;
        let skipped = discovered.skipped.clone();
        let resolution = ModuleDependencies::resolve_with(discovered, &self.options);
        Ok(LoadPlan {
            skipped,
            resolution,
        })
    }

    /// Run the full startup sequence
    ///
    /// Any error is fatal: the host is left in the state where it failed and
    /// nothing is rolled back.
    pub async fn start(mut self) -> Result<ModuleHost, ModuleError> {
        info!("Starting module host");

        let sources = std::mem::take(&mut self.sources);
        let discovered = ModuleDiscovery::new(sources).discover_modules()?;
        let skipped = discovered.skipped.clone();
        self.advance(LifecycleState::Discovered)?;

        let resolution = ModuleDependencies::resolve_with(discovered, &self.options);
        let disabled: Vec<DisabledEntry> = resolution
            .disabled
            .iter()
            .map(|d| DisabledEntry {
                id: d.id().to_string(),
                reason: d.reason.clone(),
            })
            .collect();
        self.advance(LifecycleState::Resolved)?;

        self.advance(LifecycleState::Registering)?;
        let registration = ModuleLoader::register_modules(resolution);
        let actions = Arc::new(registration.actions);

        self.advance(LifecycleState::Initializing)?;
        if let Err(e) = ModuleLoader::initialize_modules(
            registration.hooks,
            Arc::clone(&actions),
            &self.module_configs,
        )
        .await
        {
            error!("Module host startup failed: {}", e);
            return Err(e);
        }

        self.advance(LifecycleState::Ready)?;
        info!(
            "Module host ready with {} modules: {:?}",
            registration.modules.len(),
            registration.modules.ids()
        );

        Ok(ModuleHost {
            modules: Arc::new(registration.modules),
            commands: Arc::new(registration.commands),
            events: Arc::new(registration.events),
            components: Arc::new(registration.components),
            actions,
            disabled: Arc::new(disabled),
            skipped: Arc::new(skipped),
            state: self.state_tx.subscribe(),
        })
    }
}

/// The started host. Everything inside is frozen.
#[derive(Clone)]
pub struct ModuleHost {
    modules: Arc<LoadedModuleSet>,
    commands: Arc<CommandRegistry>,
    events: Arc<EventRegistry>,
    components: Arc<ComponentRegistry>,
    actions: Arc<ActionRegistry>,
    disabled: Arc<Vec<DisabledEntry>>,
    skipped: Arc<Vec<SkippedCandidate>>,
    state: watch::Receiver<LifecycleState>,
}

impl ModuleHost {
    pub fn modules(&self) -> Arc<LoadedModuleSet> {
        Arc::clone(&self.modules)
    }

    pub fn commands(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.commands)
    }

    pub fn events(&self) -> Arc<EventRegistry> {
        Arc::clone(&self.events)
    }

    pub fn components(&self) -> Arc<ComponentRegistry> {
        Arc::clone(&self.components)
    }

    pub fn actions(&self) -> Arc<ActionRegistry> {
        Arc::clone(&self.actions)
    }

    /// Modules disabled during resolution, in discovery order
    pub fn disabled(&self) -> &[DisabledEntry] {
        &self.disabled
    }

    /// Candidates discovery passed over
    pub fn skipped(&self) -> &[SkippedCandidate] {
        &self.skipped
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Lifecycle receiver for readiness gating
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.clone()
    }
}

impl std::fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules", &self.modules.ids())
            .field("disabled", &self.disabled)
            .field("state", &self.state())
            .finish()
    }
}
