//! Module system for modhost
//!
//! Modules are registered statically as [`ModuleSource`]s. The
//! [`ModuleManager`] discovers them, resolves their dependencies, registers
//! their capabilities and actions, and runs their init hooks in order,
//! producing a frozen [`ModuleHost`].
//!
//! ## Startup phases
//!
//! Pending → Discovered → Resolved → Registering → Initializing → Ready.
//! A module whose dependency is missing or disabled is disabled too, and the
//! same goes transitively. Dependency cycles disable every module on them.

pub mod api;
pub mod capability;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod validation;

pub use api::{Action, ActionFn, ActionRegistry};
pub use capability::{
    Command, CommandRegistry, Component, ComponentRegistry, Event, EventRegistry,
};
pub use loader::{LoadedModuleSet, ModuleLoader};
pub use manager::{DisabledEntry, LoadPlan, ModuleHost, ModuleManager};
pub use registry::{DisableReason, ModuleDescriptor, ModuleManifest};
pub use traits::{
    init_hook, noop_init_hook, InitHook, LifecycleState, ModuleError, ModuleExports,
    ModuleInitContext, ModuleSource, StaticModule,
};
