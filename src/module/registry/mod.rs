//! Module registry and discovery
//!
//! Handles module discovery, manifest parsing, and dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod manifest;

pub use dependencies::{
    DependencyGraph, DependencyResolution, DisableReason, DisabledModule, GraphNode,
    ModuleDependencies, ResolveOptions,
};
pub use discovery::{DiscoveredModule, DiscoveredSet, ModuleDiscovery, SkipReason};
pub use manifest::{ModuleDescriptor, ModuleManifest};
