//! Module validation framework
//!
//! Structural checks applied to every candidate manifest during discovery.

pub mod manifest_validator;

pub use manifest_validator::{ManifestValidator, ValidationResult};
