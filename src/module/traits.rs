//! Module system traits and interfaces
//!
//! Defines the contract a module exports to be discovered, the lifecycle
//! states the host moves through, and the errors raised along the way.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::module::api::actions::ActionRegistry;
use crate::module::registry::manifest::ModuleDescriptor;

/// Host lifecycle state
///
/// Transitions are strictly forward:
/// `Discovered -> Resolved -> Registering -> Initializing -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Nothing has been loaded yet
    Pending,
    /// Candidates loaded and validated
    Discovered,
    /// Dependencies resolved, load order fixed
    Resolved,
    /// Capabilities and actions are being fed into the registries
    Registering,
    /// Init hooks are running, one module at a time
    Initializing,
    /// Terminal state; registries are read-only
    Ready,
}

impl LifecycleState {
    /// Whether the host has finished starting up
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }

    /// The only state this one may move to
    pub fn next(self) -> Option<Self> {
        match self {
            LifecycleState::Pending => Some(LifecycleState::Discovered),
            LifecycleState::Discovered => Some(LifecycleState::Resolved),
            LifecycleState::Resolved => Some(LifecycleState::Registering),
            LifecycleState::Registering => Some(LifecycleState::Initializing),
            LifecycleState::Initializing => Some(LifecycleState::Ready),
            LifecycleState::Ready => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Discovered => "discovered",
            LifecycleState::Resolved => "resolved",
            LifecycleState::Registering => "registering",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Context handed to a module's init hook
///
/// By the time a hook runs, every registry is populated and every module
/// earlier in the load order has finished initializing.
#[derive(Clone)]
pub struct ModuleInitContext {
    /// Id of the module being initialized
    pub module_id: String,
    /// Frozen action registry
    pub actions: Arc<ActionRegistry>,
    /// Module configuration (key-value pairs from config file)
    pub config: HashMap<String, String>,
}

impl ModuleInitContext {
    /// Create a new init context
    pub fn new(
        module_id: impl Into<String>,
        actions: Arc<ActionRegistry>,
        config: HashMap<String, String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            actions,
            config,
        }
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

impl fmt::Debug for ModuleInitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInitContext")
            .field("module_id", &self.module_id)
            .field("config", &self.config)
            .finish()
    }
}

/// A module's initialization hook
pub type InitHook =
    Box<dyn FnOnce(ModuleInitContext) -> BoxFuture<'static, Result<(), ModuleError>> + Send>;

/// Wrap an async closure as an [`InitHook`]
pub fn init_hook<F, Fut>(f: F) -> InitHook
where
    F: FnOnce(ModuleInitContext) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<(), ModuleError>> + Send + 'static,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// An init hook that does nothing
pub fn noop_init_hook() -> InitHook {
    init_hook(|_| async { Ok(()) })
}

/// What a module candidate exports once loaded
///
/// Both parts are required for the candidate to be accepted; discovery
/// skips candidates missing either one.
#[derive(Default)]
pub struct ModuleExports {
    /// Module descriptor (manifest, capabilities, actions, router)
    pub descriptor: Option<ModuleDescriptor>,
    /// Initialization hook
    pub init: Option<InitHook>,
}

impl ModuleExports {
    /// Exports with both a descriptor and an init hook
    pub fn new(descriptor: ModuleDescriptor, init: InitHook) -> Self {
        Self {
            descriptor: Some(descriptor),
            init: Some(init),
        }
    }
}

/// A module candidate on the static registration list
///
/// `load` is where a module builds its descriptor (and parses any embedded
/// manifest). An `Err` from `load` aborts discovery.
pub trait ModuleSource: Send + Sync {
    /// Human-readable location used in skip and failure logs
    fn location(&self) -> &str;

    /// Load the candidate's exports
    fn load(&self) -> Result<ModuleExports, ModuleError>;
}

/// [`ModuleSource`] backed by a plain constructor function
pub struct StaticModule {
    location: String,
    constructor: Box<dyn Fn() -> Result<ModuleExports, ModuleError> + Send + Sync>,
}

impl StaticModule {
    /// Register a constructor under a location name
    pub fn new<F>(location: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<ModuleExports, ModuleError> + Send + Sync + 'static,
    {
        Self {
            location: location.into(),
            constructor: Box::new(constructor),
        }
    }
}

impl ModuleSource for StaticModule {
    fn location(&self) -> &str {
        &self.location
    }

    fn load(&self) -> Result<ModuleExports, ModuleError> {
        (self.constructor)()
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Failed to load module from {location}: {reason}")]
    LoadError { location: String, reason: String },

    #[error("Module initialization failed: {0}")]
    InitializationError(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Action {module_id}.{action_id} has signature {actual}, expected {expected}")]
    ActionSignatureMismatch {
        module_id: String,
        action_id: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}

impl From<crate::storage::StorageError> for ModuleError {
    fn from(e: crate::storage::StorageError) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}
