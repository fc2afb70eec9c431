//! Per-dispatch interaction context and tenant context resolution

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::gateway::{Choice, Embed, InteractionResponse, Message, SharedSink};
use crate::interaction::types::{CommandInteraction, ComponentInteraction, InteractionMeta};
use crate::interaction::ExecutionError;
use crate::module::api::actions::{ActionFn, ActionRegistry};
use crate::module::traits::ModuleError;
use crate::storage::SettingsRecord;

/// Access to the shared interaction fields
pub trait HasMeta {
    fn meta(&self) -> &InteractionMeta;
}

impl HasMeta for CommandInteraction {
    fn meta(&self) -> &InteractionMeta {
        &self.meta
    }
}

impl HasMeta for ComponentInteraction {
    fn meta(&self) -> &InteractionMeta {
        &self.meta
    }
}

/// What a handler receives: the interaction, the tenant's settings (if any)
/// and a way to reply
pub struct InteractionContext<I> {
    pub interaction: I,
    pub settings: Option<SettingsRecord>,
    pub actions: Arc<ActionRegistry>,
    responder: SharedSink,
}

impl<I: HasMeta> InteractionContext<I> {
    pub fn new(
        interaction: I,
        settings: Option<SettingsRecord>,
        actions: Arc<ActionRegistry>,
        responder: SharedSink,
    ) -> Self {
        Self {
            interaction,
            settings,
            actions,
            responder,
        }
    }

    pub fn meta(&self) -> &InteractionMeta {
        self.interaction.meta()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.meta().tenant_id.as_deref()
    }

    /// Send a message reply
    pub async fn reply(&self, message: Message) -> Result<(), ExecutionError> {
        let id = self.meta().id.clone();
        self.responder
            .send(InteractionResponse::message(id, message))
            .await
    }

    /// Reply with a single embed, visible only to the caller
    pub async fn reply_ephemeral(&self, embed: Embed) -> Result<(), ExecutionError> {
        self.reply(Message::embed(embed).ephemeral()).await
    }

    /// Reply with autocomplete choices
    pub async fn autocomplete(&self, choices: Vec<Choice>) -> Result<(), ExecutionError> {
        let id = self.meta().id.clone();
        self.responder
            .send(InteractionResponse::autocomplete(id, choices))
            .await
    }

    /// Default error reply: an ephemeral error embed
    pub async fn reply_error(&self, error: &ExecutionError) -> Result<(), ExecutionError> {
        self.reply_ephemeral(Embed::error(error.user_message())).await
    }
}

impl<I: fmt::Debug> fmt::Debug for InteractionContext<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionContext")
            .field("interaction", &self.interaction)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Resolves the per-tenant settings record before dispatch
///
/// Built once from the frozen action registry; both actions must exist for
/// the provider to be active.
#[derive(Clone, Default)]
pub struct ContextProvider {
    actions: Option<(
        ActionFn<String, Option<SettingsRecord>>,
        ActionFn<String, SettingsRecord>,
    )>,
}

impl ContextProvider {
    /// Provider that never attaches settings
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Look up `module.fetch` and `module.create` in the registry
    ///
    /// Missing actions disable the provider. An action with the wrong
    /// signature is an error.
    pub fn from_registry(
        registry: &ActionRegistry,
        module_id: &str,
        fetch_action: &str,
        create_action: &str,
    ) -> Result<Self, ModuleError> {
        let fetch = registry.typed::<String, Option<SettingsRecord>>(module_id, fetch_action)?;
        let create = registry.typed::<String, SettingsRecord>(module_id, create_action)?;
        match (fetch, create) {
            (Some(fetch), Some(create)) => {
                info!(
                    "Interaction context provided by {}.{} / {}.{}",
                    module_id, fetch_action, module_id, create_action
                );
                Ok(Self {
                    actions: Some((fetch, create)),
                })
            }
            _ => {
                info!(
                    "Context provider '{}' not available, interactions run without settings",
                    module_id
                );
                Ok(Self::disabled())
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.actions.is_some()
    }

    /// Fetch the tenant's record, creating it if absent
    ///
    /// Returns `None` without a provider, without a tenant, or when the
    /// provider fails (logged).
    pub async fn resolve(&self, tenant_id: Option<&str>) -> Option<SettingsRecord> {
        let (fetch, create) = self.actions.as_ref()?;
        let tenant_id = tenant_id?;

        let fetched = match fetch.call(tenant_id.to_string()).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to fetch settings for tenant {}: {}", tenant_id, e);
                return None;
            }
        };
        if fetched.is_some() {
            return fetched;
        }

        debug!("No settings for tenant {}, creating", tenant_id);
        match create.call(tenant_id.to_string()).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to create settings for tenant {}: {}", tenant_id, e);
                None
            }
        }
    }
}

impl fmt::Debug for ContextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProvider")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::api::actions::Action;
    use crate::storage::{MemorySettingsStore, SettingsStore};
    use std::collections::HashMap;

    fn registry_with_store(store: Arc<MemorySettingsStore>) -> ActionRegistry {
        let fetch_store = Arc::clone(&store);
        let create_store = store;
        let mut actions = HashMap::new();
        actions.insert(
            "getSettings".to_string(),
            Action::new(move |tenant: String| {
                let store = Arc::clone(&fetch_store);
                async move { Ok(store.get(&tenant).await?) }
            }),
        );
        actions.insert(
            "createSettings".to_string(),
            Action::new(move |tenant: String| {
                let store = Arc::clone(&create_store);
                async move { Ok(store.create(&tenant).await?) }
            }),
        );
        let mut registry = ActionRegistry::new();
        registry.register_actions("settings", actions);
        registry
    }

    #[tokio::test]
    async fn creates_then_fetches_same_record() {
        let store = Arc::new(MemorySettingsStore::new());
        let registry = registry_with_store(Arc::clone(&store));
        let provider =
            ContextProvider::from_registry(&registry, "settings", "getSettings", "createSettings")
                .unwrap();
        assert!(provider.is_enabled());

        let first = provider.resolve(Some("g1")).await.unwrap();
        let second = provider.resolve(Some("g1")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn no_tenant_or_provider_means_no_settings() {
        let registry = registry_with_store(Arc::new(MemorySettingsStore::new()));
        let provider =
            ContextProvider::from_registry(&registry, "settings", "getSettings", "createSettings")
                .unwrap();
        assert!(provider.resolve(None).await.is_none());

        let missing =
            ContextProvider::from_registry(&registry, "prefs", "getSettings", "createSettings")
                .unwrap();
        assert!(!missing.is_enabled());
        assert!(missing.resolve(Some("g1")).await.is_none());
    }

    #[test]
    fn wrong_signature_fails_construction() {
        let mut actions = HashMap::new();
        actions.insert(
            "getSettings".to_string(),
            Action::new(|_: u64| async { Ok(()) }),
        );
        let mut registry = ActionRegistry::new();
        registry.register_actions("settings", actions);
        let err =
            ContextProvider::from_registry(&registry, "settings", "getSettings", "createSettings")
                .unwrap_err();
        assert!(matches!(err, ModuleError::ActionSignatureMismatch { .. }));
    }

    #[tokio::test]
    async fn failing_provider_yields_empty_context() {
        let mut actions = HashMap::new();
        actions.insert(
            "getSettings".to_string(),
            Action::new(|_: String| async {
                Err::<Option<SettingsRecord>, _>(ModuleError::OperationError("db down".into()))
            }),
        );
        actions.insert(
            "createSettings".to_string(),
            Action::new(|tenant: String| async move { Ok(SettingsRecord::new(tenant)) }),
        );
        let mut registry = ActionRegistry::new();
        registry.register_actions("settings", actions);
        let provider =
            ContextProvider::from_registry(&registry, "settings", "getSettings", "createSettings")
                .unwrap();
        assert!(provider.resolve(Some("g1")).await.is_none());
    }
}
