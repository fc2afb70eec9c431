//! Built-in settings module
//!
//! Owns the per-tenant settings records. Publishes `getSettings` and
//! `createSettings` actions (used by the interaction context provider), the
//! `/settings` command, the `tenantUpdate` event and a small HTTP router.

pub mod api;
pub mod command;
pub mod event;
pub mod setting;
pub mod tenant;

use std::sync::Arc;
use tracing::info;

use crate::module::api::actions::Action;
use crate::module::registry::manifest::{ModuleDescriptor, ModuleManifest};
use crate::module::traits::{init_hook, ModuleError, ModuleExports, ModuleSource};
use crate::storage::SettingsStore;

pub use api::SettingsRouter;
pub use command::SettingsCommand;
pub use event::{TenantUpdateEvent, TENANT_UPDATE};
pub use setting::{default_settings, Setting, SettingKind, CATEGORY, CHANNEL, ROLE};
pub use tenant::{ChannelInfo, ChannelKind, MemoryTenantDirectory, RoleInfo, TenantDirectory, TenantInfo};

/// Module id
pub const MODULE_ID: &str = "settings";
/// `fn(String) -> Option<SettingsRecord>`
pub const GET_SETTINGS: &str = "getSettings";
/// `fn(String) -> SettingsRecord`
pub const CREATE_SETTINGS: &str = "createSettings";

const MANIFEST: &str = r#"
id = "settings"
version = "0.1.0"
description = "Per-tenant settings"
"#;

/// [`ModuleSource`] for the settings module
pub struct SettingsModule {
    store: Arc<dyn SettingsStore>,
    directory: Arc<dyn TenantDirectory>,
    settings: Arc<Vec<Setting>>,
}

impl SettingsModule {
    pub fn new(store: Arc<dyn SettingsStore>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            store,
            directory,
            settings: Arc::new(default_settings()),
        }
    }

    /// Replace the default setting definitions
    pub fn with_settings(mut self, settings: Vec<Setting>) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    fn descriptor(&self) -> Result<ModuleDescriptor, ModuleError> {
        let manifest = ModuleManifest::from_toml_str(MANIFEST)?;

        let store = Arc::clone(&self.store);
        let get = Action::new(move |tenant_id: String| {
            let store = Arc::clone(&store);
            async move { Ok::<_, ModuleError>(store.get(&tenant_id).await?) }
        });
        let store = Arc::clone(&self.store);
        let create = Action::new(move |tenant_id: String| {
            let store = Arc::clone(&store);
            async move { Ok::<_, ModuleError>(store.create(&tenant_id).await?) }
        });

        Ok(ModuleDescriptor::new(manifest)
            .with_command(SettingsCommand::new(
                Arc::clone(&self.settings),
                Arc::clone(&self.store),
                Arc::clone(&self.directory),
            ))
            .with_event(TenantUpdateEvent::new(Arc::clone(&self.directory)))
            .with_action(GET_SETTINGS, get)
            .with_action(CREATE_SETTINGS, create)
            .with_router(SettingsRouter))
    }
}

impl ModuleSource for SettingsModule {
    fn location(&self) -> &str {
        "builtin:settings"
    }

    fn load(&self) -> Result<ModuleExports, ModuleError> {
        let count = self.settings.len();
        let init = init_hook(move |ctx| async move {
            if ctx.actions.lookup(&ctx.module_id, GET_SETTINGS).is_none() {
                return Err(ModuleError::InitializationError(format!(
                    "{}.{} is not registered",
                    ctx.module_id, GET_SETTINGS
                )));
            }
            info!("Settings module ready with {} settings", count);
            Ok(())
        });
        Ok(ModuleExports::new(self.descriptor()?, init))
    }
}
