//! Interaction router
//!
//! Classifies inbound gateway events, attaches the tenant's settings and
//! hands the interaction to the matching registered handler. A failing or
//! panicking handler only affects its own dispatch.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::gateway::{GatewayEvent, SharedSink};
use crate::interaction::context::{ContextProvider, InteractionContext};
use crate::interaction::types::{Interaction, RawInteraction};
use crate::interaction::ExecutionError;
use crate::module::api::actions::ActionRegistry;
use crate::module::capability::{CommandRegistry, ComponentRegistry, EventRegistry};
use crate::module::manager::ModuleHost;

/// What happened to a single dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handler ran and succeeded
    Handled,
    /// Handler returned an error; its error hook ran
    Failed,
    /// No handler registered for the target
    NotFound,
    /// Unsupported interaction kind, dropped
    Dropped,
    /// Handler panicked
    Panicked,
}

/// Routes gateway events to registered capabilities
pub struct InteractionRouter {
    commands: Arc<CommandRegistry>,
    components: Arc<ComponentRegistry>,
    events: Arc<EventRegistry>,
    actions: Arc<ActionRegistry>,
    provider: ContextProvider,
    sink: SharedSink,
}

impl InteractionRouter {
    pub fn new(host: &ModuleHost, provider: ContextProvider, sink: SharedSink) -> Self {
        Self {
            commands: host.commands(),
            components: host.components(),
            events: host.events(),
            actions: host.actions(),
            provider,
            sink,
        }
    }

    /// Handle one gateway event
    pub async fn handle(&self, event: GatewayEvent) -> DispatchOutcome {
        match event {
            GatewayEvent::Interaction { interaction } => self.dispatch(interaction).await,
            GatewayEvent::Dispatch { name, payload } => self.dispatch_event(&name, &payload).await,
        }
    }

    /// Handle one gateway event, containing panics
    pub async fn handle_guarded(&self, event: GatewayEvent) -> DispatchOutcome {
        match AssertUnwindSafe(self.handle(event)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!("Handler panicked: {}", panic_message(&*panic));
                DispatchOutcome::Panicked
            }
        }
    }

    /// Route an interaction to its command or component handler
    pub async fn dispatch(&self, raw: RawInteraction) -> DispatchOutcome {
        let Some(interaction) = Interaction::classify(&raw) else {
            debug!(
                "Dropping interaction {} of unsupported type {}",
                raw.id, raw.kind
            );
            return DispatchOutcome::Dropped;
        };
        debug!(
            "Dispatching {} '{}' for interaction {}",
            interaction.kind_name(),
            interaction.target(),
            raw.id
        );

        match interaction {
            Interaction::Command(command) => {
                let Some(handler) = self.commands.lookup(&command.name) else {
                    debug!("No command registered for /{}", command.name);
                    return DispatchOutcome::NotFound;
                };
                let ctx = self.context(command).await;
                match handler.run(&ctx).await {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(e) => {
                        log_failure("command", &ctx.interaction.name, &e);
                        handler.error(&ctx, e).await;
                        DispatchOutcome::Failed
                    }
                }
            }
            Interaction::Autocomplete(command) => {
                let Some(handler) = self.commands.lookup(&command.name) else {
                    debug!("No command registered for autocomplete /{}", command.name);
                    return DispatchOutcome::NotFound;
                };
                let ctx = self.context(command).await;
                match handler.autocomplete(&ctx).await {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(e) => {
                        log_failure("autocomplete", &ctx.interaction.name, &e);
                        handler.error(&ctx, e).await;
                        DispatchOutcome::Failed
                    }
                }
            }
            Interaction::Component(component) => {
                let handler = self
                    .components
                    .lookup(&component.custom_id)
                    .or_else(|| self.components.lookup(component.route_key()));
                let Some(handler) = handler else {
                    debug!("No component registered for '{}'", component.custom_id);
                    return DispatchOutcome::NotFound;
                };
                let ctx = self.context(component).await;
                match handler.run(&ctx).await {
                    Ok(()) => DispatchOutcome::Handled,
                    Err(e) => {
                        log_failure("component", &ctx.interaction.custom_id, &e);
                        handler.error(&ctx, e).await;
                        DispatchOutcome::Failed
                    }
                }
            }
        }
    }

    /// Route a named gateway event to its event handler
    pub async fn dispatch_event(&self, name: &str, payload: &Value) -> DispatchOutcome {
        let Some(handler) = self.events.lookup(name) else {
            debug!("No event handler registered for '{}'", name);
            return DispatchOutcome::NotFound;
        };
        match handler.run(payload).await {
            Ok(()) => DispatchOutcome::Handled,
            Err(e) => {
                handler.error(e).await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn context<I>(&self, interaction: I) -> InteractionContext<I>
    where
        I: crate::interaction::context::HasMeta,
    {
        let settings = self
            .provider
            .resolve(interaction.meta().tenant_id.as_deref())
            .await;
        InteractionContext::new(
            interaction,
            settings,
            Arc::clone(&self.actions),
            Arc::clone(&self.sink),
        )
    }

    /// Consume gateway events until the channel closes or shutdown is
    /// signalled, one task per event
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<GatewayEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Interaction router running");
        let mut tasks = JoinSet::new();
        let mut watching = true;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Gateway event stream ended");
                        break;
                    };
                    let router = Arc::clone(&self);
                    tasks.spawn(async move { router.handle_guarded(event).await });
                }
                changed = shutdown.changed(), if watching => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => {
                            info!("Interaction router stopping");
                            break;
                        }
                        Ok(()) => {}
                        // Sender gone: nobody can request shutdown any more
                        Err(_) => watching = false,
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Dispatch task failed: {}", e);
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Dispatch task failed: {}", e);
            }
        }
    }
}

fn log_failure(kind: &str, target: &str, err: &ExecutionError) {
    if err.is_user_facing() {
        debug!("{} '{}' rejected: {}", kind, target, err);
    } else {
        error!("{} '{}' failed: {}", kind, target, err);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        warn!("Handler panicked with a non-string payload");
        "unknown panic".to_string()
    }
}
