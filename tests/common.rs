//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use modhost::gateway::{InteractionResponse, Message, ResponseBody, ResponseSink};
use modhost::interaction::types::{
    codes, CommandInteraction, ComponentInteraction, InteractionMeta, RawInteraction,
};
use modhost::interaction::{ExecutionError, InteractionContext};
use modhost::module::{
    noop_init_hook, Command, Component, Event, InitHook, ModuleDescriptor, ModuleError,
    ModuleExports, ModuleManifest, ModuleSource, StaticModule,
};
use modhost::settings::{ChannelKind, TenantInfo};

/// Sink that keeps every response
#[derive(Default)]
pub struct RecordingSink {
    responses: Mutex<Vec<InteractionResponse>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn responses(&self) -> Vec<InteractionResponse> {
        self.responses.lock().unwrap().clone()
    }

    /// Message bodies, in send order
    pub fn messages(&self) -> Vec<Message> {
        self.responses()
            .into_iter()
            .filter_map(|r| match r.body {
                ResponseBody::Message(m) => Some(m),
                ResponseBody::Autocomplete { .. } => None,
            })
            .collect()
    }

    /// Description of the only embed of the last message
    pub fn last_description(&self) -> Option<String> {
        self.messages()
            .last()
            .and_then(|m| m.embeds.first())
            .and_then(|e| e.description.clone())
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn send(&self, response: InteractionResponse) -> Result<(), ExecutionError> {
        self.responses.lock().unwrap().push(response);
        Ok(())
    }
}

/// Module source from a descriptor builder
pub fn source_with<F>(id: &str, build: F) -> Box<dyn ModuleSource>
where
    F: Fn(ModuleDescriptor) -> ModuleDescriptor + Send + Sync + 'static,
{
    let id = id.to_string();
    Box::new(StaticModule::new(format!("test:{}", id), move || {
        Ok(ModuleExports::new(
            build(ModuleDescriptor::new(ModuleManifest::new(id.clone()))),
            noop_init_hook(),
        ))
    }))
}

/// Module source with just a manifest and a no-op init
pub fn source(manifest: ModuleManifest) -> Box<dyn ModuleSource> {
    let location = format!("test:{}", manifest.id);
    Box::new(StaticModule::new(location, move || {
        Ok(ModuleExports::new(
            ModuleDescriptor::new(manifest.clone()),
            noop_init_hook(),
        ))
    }))
}

/// Module source whose init hook is built fresh on every load
pub fn source_with_init<F>(manifest: ModuleManifest, init: F) -> Box<dyn ModuleSource>
where
    F: Fn() -> InitHook + Send + Sync + 'static,
{
    let location = format!("test:{}", manifest.id);
    Box::new(StaticModule::new(location, move || {
        Ok(ModuleExports::new(ModuleDescriptor::new(manifest.clone()), init()))
    }))
}

/// Candidate that exports nothing
pub fn empty_source(location: &str) -> Box<dyn ModuleSource> {
    Box::new(StaticModule::new(location, || Ok(ModuleExports::default())))
}

/// Candidate whose load fails outright
pub fn broken_source(location: &str) -> Box<dyn ModuleSource> {
    let loc = location.to_string();
    Box::new(StaticModule::new(location, move || {
        Err(ModuleError::LoadError {
            location: loc.clone(),
            reason: "corrupt".to_string(),
        })
    }))
}

/// Command that replies with a fixed text and counts invocations
pub struct EchoCommand {
    pub name: &'static str,
    pub reply: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl EchoCommand {
    pub fn new(name: &'static str, reply: &'static str) -> Self {
        Self {
            name,
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.reply(Message::text(self.reply)).await
    }
}

/// Command that always fails
pub struct FailingCommand {
    pub name: &'static str,
    pub error: ExecutionError,
}

#[async_trait]
impl Command for FailingCommand {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        Err(self.error.clone())
    }
}

/// Command that panics
pub struct PanickingCommand;

#[async_trait]
impl Command for PanickingCommand {
    fn name(&self) -> &str {
        "explode"
    }

    async fn run(&self, _ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        panic!("handler blew up");
    }
}

/// Command that reports whether settings were attached
pub struct SettingsProbe;

#[async_trait]
impl Command for SettingsProbe {
    fn name(&self) -> &str {
        "probe"
    }

    async fn run(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError> {
        let text = match &ctx.settings {
            Some(record) => format!("settings:{}", record.tenant_id),
            None => "no settings".to_string(),
        };
        ctx.reply(Message::text(text)).await
    }
}

/// Component that echoes its custom id
pub struct EchoComponent(pub &'static str);

#[async_trait]
impl Component for EchoComponent {
    fn name(&self) -> &str {
        self.0
    }

    async fn run(&self, ctx: &InteractionContext<ComponentInteraction>) -> Result<(), ExecutionError> {
        ctx.reply(Message::text(ctx.interaction.custom_id.clone())).await
    }
}

/// Event handler counting invocations
pub struct CountingEvent {
    pub name: &'static str,
    pub seen: Arc<Mutex<Vec<Value>>>,
}

impl CountingEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Event for CountingEvent {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, payload: &Value) -> Result<(), ExecutionError> {
        self.seen.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

pub fn meta(id: &str, tenant: Option<&str>) -> InteractionMeta {
    InteractionMeta {
        id: id.to_string(),
        tenant_id: tenant.map(str::to_string),
        ..InteractionMeta::default()
    }
}

/// Raw slash-command interaction
pub fn raw_command(id: &str, tenant: Option<&str>, name: &str) -> RawInteraction {
    RawInteraction {
        id: id.to_string(),
        kind: codes::APPLICATION_COMMAND,
        guild_id: tenant.map(str::to_string),
        channel_id: None,
        user: None,
        data: Some(serde_json::json!({ "name": name })),
    }
}

/// Raw component interaction
pub fn raw_component(id: &str, custom_id: &str) -> RawInteraction {
    RawInteraction {
        id: id.to_string(),
        kind: codes::MESSAGE_COMPONENT,
        guild_id: Some("g1".to_string()),
        channel_id: None,
        user: None,
        data: Some(serde_json::json!({ "custom_id": custom_id })),
    }
}

/// Tenant with a text channel, a category and a role
pub fn guild() -> TenantInfo {
    TenantInfo::new("g1", "Test Guild")
        .with_channel("100", "general", ChannelKind::Text)
        .with_channel("101", "commissions", ChannelKind::Text)
        .with_channel("200", "Tickets", ChannelKind::Category)
        .with_role("300", "Moderators")
}
