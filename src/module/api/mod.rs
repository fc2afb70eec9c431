//! Module-facing APIs
//!
//! Cross-module actions that modules publish and call.

pub mod actions;

pub use actions::{Action, ActionFn, ActionRegistry};
