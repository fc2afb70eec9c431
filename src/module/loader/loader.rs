//! Module loader implementation
//!
//! Feeds resolved modules into the registries, then runs their init hooks
//! one at a time in load order.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::module::api::actions::ActionRegistry;
use crate::module::capability::{CommandRegistry, ComponentRegistry, EventRegistry};
use crate::module::registry::dependencies::DependencyResolution;
use crate::module::registry::manifest::ModuleDescriptor;
use crate::module::traits::{InitHook, ModuleError, ModuleInitContext};

/// Enabled modules in load order. Read-only once built.
#[derive(Debug, Default)]
pub struct LoadedModuleSet {
    modules: Vec<ModuleDescriptor>,
}

impl LoadedModuleSet {
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    /// Ids in load order
    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Everything the registration phase produces
#[derive(Default)]
pub struct Registration {
    pub modules: LoadedModuleSet,
    pub commands: CommandRegistry,
    pub events: EventRegistry,
    pub components: ComponentRegistry,
    pub actions: ActionRegistry,
    /// Init hooks in load order, consumed by [`ModuleLoader::initialize_modules`]
    pub hooks: Vec<(String, InitHook)>,
}

/// Module loader for registering and initializing modules
pub struct ModuleLoader;

impl ModuleLoader {
    /// Register every enabled module's capabilities and actions, in load order
    pub fn register_modules(resolution: DependencyResolution) -> Registration {
        let mut registration = Registration::default();

        for discovered in resolution.modules {
            let id = discovered.id().to_string();
            let mut descriptor = discovered.descriptor;
            debug!("Registering module: {}", id);

            for command in &descriptor.commands {
                registration.commands.register(&id, Arc::clone(command));
            }
            for event in &descriptor.events {
                registration.events.register(&id, Arc::clone(event));
            }
            for component in &descriptor.components {
                registration.components.register(&id, Arc::clone(component));
            }
            registration
                .actions
                .register_actions(&id, std::mem::take(&mut descriptor.actions));

            registration.hooks.push((id, discovered.init));
            registration.modules.modules.push(descriptor);
        }

        info!(
            "Registered {} modules: {} commands, {} events, {} components, {} actions",
            registration.modules.len(),
            registration.commands.len(),
            registration.events.len(),
            registration.components.len(),
            registration.actions.len()
        );
        registration
    }

    /// Run init hooks strictly in order; the first failure stops startup
    pub async fn initialize_modules(
        hooks: Vec<(String, InitHook)>,
        actions: Arc<ActionRegistry>,
        module_configs: &HashMap<String, HashMap<String, String>>,
    ) -> Result<(), ModuleError> {
        for (module_id, hook) in hooks {
            info!("Initializing module: {}", module_id);

            let config = module_configs.get(&module_id).cloned().unwrap_or_default();
            let ctx = ModuleInitContext::new(module_id.clone(), Arc::clone(&actions), config);

            if let Err(e) = hook(ctx).await {
                error!("Module {} failed to initialize: {}", module_id, e);
                return Err(match e {
                    ModuleError::InitializationError(_) => e,
                    other => ModuleError::InitializationError(format!(
                        "{}: {}",
                        module_id, other
                    )),
                });
            }
        }
        Ok(())
    }
}
