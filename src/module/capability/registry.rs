//! Capability registries
//!
//! Identifier -> handler maps populated once during registration. The first
//! module to register an identifier keeps it.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Command, Component, Event, Named};

struct Entry<T: ?Sized> {
    handler: Arc<T>,
    owner: String,
}

/// Registry of one capability kind
pub struct CapabilityRegistry<T: ?Sized + Named> {
    entries: HashMap<String, Entry<T>>,
    /// Registration order
    order: Vec<String>,
}

pub type CommandRegistry = CapabilityRegistry<dyn Command>;
pub type EventRegistry = CapabilityRegistry<dyn Event>;
pub type ComponentRegistry = CapabilityRegistry<dyn Component>;

impl<T: ?Sized + Named> CapabilityRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a handler on behalf of `owner`
    ///
    /// Returns `false` (and logs a warning naming both owners) if the
    /// identifier is already taken.
    pub fn register(&mut self, owner: &str, handler: Arc<T>) -> bool {
        let name = handler.name().to_string();
        if let Some(existing) = self.entries.get(&name) {
            warn!(
                "Duplicate {} '{}' from module '{}' ignored; already registered by module '{}'",
                T::KIND,
                name,
                owner,
                existing.owner
            );
            return false;
        }
        debug!("Registered {} '{}' from module '{}'", T::KIND, name, owner);
        self.order.push(name.clone());
        self.entries.insert(
            name,
            Entry {
                handler,
                owner: owner.to_string(),
            },
        );
        true
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).map(|e| Arc::clone(&e.handler))
    }

    /// Module that registered `name`
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.owner.as_str())
    }

    /// Identifiers in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: ?Sized + Named> Default for CapabilityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + Named> std::fmt::Debug for CapabilityRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("kind", &T::KIND)
            .field("names", &self.order)
            .finish()
    }
}
