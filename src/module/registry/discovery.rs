//! Module discovery
//!
//! Walks the static registration list, loads each candidate and validates its
//! contract. Contract problems skip the candidate; a load failure aborts
//! discovery altogether.

use std::fmt;
use tracing::{debug, error, info, warn};

use crate::module::registry::manifest::ModuleDescriptor;
use crate::module::traits::{InitHook, ModuleError, ModuleSource};
use crate::module::validation::{ManifestValidator, ValidationResult};

/// Discovered module information
pub struct DiscoveredModule {
    /// Where the candidate came from
    pub location: String,
    /// Module descriptor
    pub descriptor: ModuleDescriptor,
    /// Initialization hook, consumed by the loader
    pub init: InitHook,
}

impl DiscoveredModule {
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }
}

impl fmt::Debug for DiscoveredModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredModule")
            .field("location", &self.location)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Why a candidate was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The candidate exported no descriptor
    MissingDescriptor,
    /// The candidate exported no init hook
    MissingInitHook,
    /// The descriptor has an empty id
    MissingId,
    /// Another candidate already claimed this id
    DuplicateId(String),
    /// Manifest failed structural validation
    InvalidManifest(Vec<String>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingDescriptor => {
                f.write_str("module does not export a descriptor")
            }
            SkipReason::MissingInitHook => f.write_str("module does not export an init hook"),
            SkipReason::MissingId => f.write_str("module descriptor has no id"),
            SkipReason::DuplicateId(id) => write!(f, "duplicate module id '{}'", id),
            SkipReason::InvalidManifest(errors) => {
                write!(f, "invalid manifest: {}", errors.join("; "))
            }
        }
    }
}

/// A candidate that discovery passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub location: String,
    pub reason: SkipReason,
}

/// Discovery output: accepted modules in discovery order plus skip records
#[derive(Debug, Default)]
pub struct DiscoveredSet {
    pub modules: Vec<DiscoveredModule>,
    pub skipped: Vec<SkippedCandidate>,
}

impl DiscoveredSet {
    /// Ids of accepted modules, in discovery order
    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Module discovery scanner
pub struct ModuleDiscovery {
    sources: Vec<Box<dyn ModuleSource>>,
    validator: ManifestValidator,
}

impl ModuleDiscovery {
    /// Create a discovery scanner over a registration list
    pub fn new(sources: Vec<Box<dyn ModuleSource>>) -> Self {
        Self {
            sources,
            validator: ManifestValidator::new(),
        }
    }

    /// Discover all modules
    ///
    /// Candidates are loaded one at a time, in registration order. The first
    /// load failure is returned and everything accepted so far is dropped.
    pub fn discover_modules(self) -> Result<DiscoveredSet, ModuleError> {
        info!("Discovering modules from {} candidates", self.sources.len());

        let mut set = DiscoveredSet::default();

        for source in &self.sources {
            let location = source.location().to_string();

            let exports = source.load().map_err(|e| {
                error!("Failed to load module from '{}': {}", location, e);
                match e {
                    ModuleError::LoadError { .. } => e,
                    other => ModuleError::LoadError {
                        location: location.clone(),
                        reason: other.to_string(),
                    },
                }
            })?;

            let (descriptor, init) = match (exports.descriptor, exports.init) {
                (None, _) => {
                    Self::skip(&mut set, location, SkipReason::MissingDescriptor);
                    continue;
                }
                (Some(_), None) => {
                    Self::skip(&mut set, location, SkipReason::MissingInitHook);
                    continue;
                }
                (Some(descriptor), Some(init)) => (descriptor, init),
            };

            if descriptor.id().trim().is_empty() {
                Self::skip(&mut set, location, SkipReason::MissingId);
                continue;
            }

            if set.modules.iter().any(|m| m.id() == descriptor.id()) {
                let id = descriptor.id().to_string();
                Self::skip(&mut set, location, SkipReason::DuplicateId(id));
                continue;
            }

            if let ValidationResult::Invalid(errors) = self.validator.validate(&descriptor.manifest)
            {
                Self::skip(&mut set, location, SkipReason::InvalidManifest(errors));
                continue;
            }

            debug!("Accepted module '{}' from '{}'", descriptor.id(), location);
            set.modules.push(DiscoveredModule {
                location,
                descriptor,
                init,
            });
        }

        info!(
            "Discovered {} modules ({} skipped)",
            set.modules.len(),
            set.skipped.len()
        );
        Ok(set)
    }

    fn skip(set: &mut DiscoveredSet, location: String, reason: SkipReason) {
        warn!("Skipping module from '{}': {}", location, reason);
        set.skipped.push(SkippedCandidate { location, reason });
    }
}
