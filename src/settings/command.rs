//! `/settings` command: view or change a tenant's settings

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::setting::Setting;
use super::tenant::{TenantDirectory, TenantInfo};
use crate::gateway::{Choice, Embed};
use crate::interaction::types::CommandInteraction;
use crate::interaction::{ExecutionError, InteractionContext};
use crate::module::capability::Command;
use crate::storage::{SettingsRecord, SettingsStore};

const NOT_SET: &str = "Not set";

/// Most choices the platform accepts in one autocomplete reply
const MAX_CHOICES: usize = 25;

pub struct SettingsCommand {
    settings: Arc<Vec<Setting>>,
    store: Arc<dyn SettingsStore>,
    directory: Arc<dyn TenantDirectory>,
}

impl SettingsCommand {
    pub fn new(
        settings: Arc<Vec<Setting>>,
        store: Arc<dyn SettingsStore>,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            settings,
            store,
            directory,
        }
    }

    fn setting(&self, key: &str) -> Result<&Setting, ExecutionError> {
        self.settings
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| ExecutionError::user(format!("No setting with the name `{}` exists.", key)))
    }

    fn tenant(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<TenantInfo, ExecutionError> {
        let tenant_id = ctx
            .tenant_id()
            .ok_or_else(|| ExecutionError::user("This command can only be used in a server."))?;
        self.directory
            .tenant(tenant_id)
            .ok_or_else(|| ExecutionError::Internal(format!("No snapshot for tenant {}", tenant_id)))
    }

    /// The record attached by the context provider, or one loaded directly
    async fn record(
        &self,
        ctx: &InteractionContext<CommandInteraction>,
        tenant: &TenantInfo,
    ) -> Result<SettingsRecord, ExecutionError> {
        if let Some(record) = &ctx.settings {
            return Ok(record.clone());
        }
        match self.store.get(&tenant.id).await? {
            Some(record) => Ok(record),
            None => Ok(self.store.create(&tenant.id).await?),
        }
    }

    async fn run_set(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        let interaction = &ctx.interaction;
        let key = interaction
            .option_str("name")
            .ok_or_else(|| ExecutionError::user("Missing option `name`."))?;
        let value = interaction
            .option_str("value")
            .ok_or_else(|| ExecutionError::user("Missing option `value`."))?;

        let setting = self.setting(&key)?;
        let tenant = self.tenant(ctx)?;
        if let Some(message) = setting.validate(&value, &tenant) {
            return Err(ExecutionError::User(message));
        }
        let new_value = setting
            .transform(&value, &tenant)
            .ok_or_else(|| ExecutionError::user("Invalid value."))?;

        let record = self.record(ctx, &tenant).await?;
        if record.get(&setting.key) == Some(new_value.as_str()) {
            return Err(ExecutionError::user("The value is already set to that."));
        }

        // only this key is written; other keys keep whatever the store holds now
        self.store
            .set_value(&tenant.id, &setting.key, &new_value)
            .await?;
        info!(
            "Tenant {} set '{}' to '{}'",
            tenant.id, setting.key, new_value
        );

        let shown = setting.format(&new_value, &tenant).unwrap_or(new_value);
        ctx.reply_ephemeral(Embed::success(format!(
            "Successfully set `{}` to {}.",
            setting.name, shown
        )))
        .await
    }

    async fn run_view(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        let tenant = self.tenant(ctx)?;

        let Some(key) = ctx.interaction.option_str("name") else {
            let record = self.record(ctx, &tenant).await?;
            let mut embed = Embed::info()
                .with_title("Settings")
                .with_description(format!("Current settings for *`{}`*:", tenant.name));
            for setting in self.settings.iter() {
                let shown = record
                    .get(&setting.key)
                    .and_then(|stored| setting.format(stored, &tenant))
                    .unwrap_or_else(|| NOT_SET.to_string());
                embed = embed.with_field(setting.name.clone(), shown, true);
            }
            return ctx.reply_ephemeral(embed).await;
        };

        let setting = self.setting(&key)?;
        let record = self.record(ctx, &tenant).await?;
        let shown = match record.get(&setting.key) {
            None => NOT_SET.to_string(),
            Some(stored) => setting
                .format(stored, &tenant)
                .unwrap_or_else(|| "Invalid".to_string()),
        };
        ctx.reply_ephemeral(
            Embed::info().with_description(format!("`{}` is set to {}.", setting.name, shown)),
        )
        .await
    }
}

#[async_trait]
impl Command for SettingsCommand {
    fn name(&self) -> &str {
        "settings"
    }

    fn description(&self) -> &str {
        "View or change settings."
    }

    async fn run(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        let sub = ctx.interaction.subcommand().map(|s| s.name.as_str());
        debug!("/settings {:?} in tenant {:?}", sub, ctx.tenant_id());
        match sub {
            Some("set") => self.run_set(ctx).await,
            Some("view") => self.run_view(ctx).await,
            _ => Err(ExecutionError::user("Unknown subcommand.")),
        }
    }

    async fn autocomplete(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        let typed = match ctx.interaction.focused() {
            Some(option) if option.name == "name" => {
                option.value_str().unwrap_or_default().to_lowercase()
            }
            _ => return ctx.autocomplete(Vec::new()).await,
        };

        let choices = self
            .settings
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&typed) || s.key.to_lowercase().contains(&typed)
            })
            .take(MAX_CHOICES)
            .map(|s| Choice {
                name: s.name.clone(),
                value: s.key.clone(),
            })
            .collect();
        ctx.autocomplete(choices).await
    }
}
