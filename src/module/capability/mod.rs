//! Module capabilities
//!
//! Commands, gateway events and UI components a module contributes. Each is
//! a trait with a name, a `run` method and an `error` hook with a default.

pub mod registry;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::interaction::types::{CommandInteraction, ComponentInteraction};
use crate::interaction::{ExecutionError, InteractionContext};

pub use registry::{CapabilityRegistry, CommandRegistry, ComponentRegistry, EventRegistry};

/// Capability stored in a [`CapabilityRegistry`]
pub trait Named {
    /// Kind used in log lines ("command", "event", "component")
    const KIND: &'static str;

    fn name(&self) -> &str;
}

/// Slash-command handler
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn run(&self, ctx: &InteractionContext<CommandInteraction>) -> Result<(), ExecutionError>;

    /// Answer an autocomplete request; no suggestions by default
    async fn autocomplete(
        &self,
        ctx: &InteractionContext<CommandInteraction>,
    ) -> Result<(), ExecutionError> {
        ctx.autocomplete(Vec::new()).await
    }

    /// Called when `run` or `autocomplete` fails
    async fn error(&self, ctx: &InteractionContext<CommandInteraction>, err: ExecutionError) {
        if let Err(e) = ctx.reply_error(&err).await {
            debug!("Failed to send error reply for /{}: {}", self.name(), e);
        }
    }
}

/// Gateway event handler
#[async_trait]
pub trait Event: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, payload: &Value) -> Result<(), ExecutionError>;

    async fn error(&self, err: ExecutionError) {
        error!("Event handler '{}' failed: {}", self.name(), err);
    }
}

/// Button / select-menu handler, keyed by custom id (or its prefix)
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &InteractionContext<ComponentInteraction>)
        -> Result<(), ExecutionError>;

    async fn error(&self, ctx: &InteractionContext<ComponentInteraction>, err: ExecutionError) {
        if let Err(e) = ctx.reply_error(&err).await {
            debug!("Failed to send error reply for component {}: {}", self.name(), e);
        }
    }
}

impl Named for dyn Command {
    const KIND: &'static str = "command";

    fn name(&self) -> &str {
        Command::name(self)
    }
}

impl Named for dyn Event {
    const KIND: &'static str = "event";

    fn name(&self) -> &str {
        Event::name(self)
    }
}

impl Named for dyn Component {
    const KIND: &'static str = "component";

    fn name(&self) -> &str {
        Component::name(self)
    }
}
