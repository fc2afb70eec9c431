//! Module loading system
//!
//! Registration of capabilities and sequential initialization.

pub mod loader;

pub use loader::{LoadedModuleSet, ModuleLoader, Registration};
