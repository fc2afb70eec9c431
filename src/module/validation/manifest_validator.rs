//! Manifest validation framework
//!
//! Validates module manifests for structure before a candidate is accepted.

use tracing::{debug, warn};

use crate::module::registry::manifest::ModuleManifest;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
pub struct ManifestValidator {
    /// Maximum id / dependency name length
    max_name_len: usize,
}

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self { max_name_len: 64 }
    }

    /// Validate a module manifest
    ///
    /// An empty id is reported separately by discovery and is not checked here.
    pub fn validate(&self, manifest: &ModuleManifest) -> ValidationResult {
        let mut errors = Vec::new();

        if !manifest.id.is_empty() && !self.is_valid_name(&manifest.id) {
            errors.push(format!(
                "Invalid module id: {} (must be alphanumeric with dashes/underscores)",
                manifest.id
            ));
        }

        if let Some(version) = &manifest.version {
            if !self.is_valid_version(version) {
                errors.push(format!(
                    "Invalid version format: {} (expected semantic versioning)",
                    version
                ));
            }
        }

        if let Err(dep_errors) = self.validate_dependencies(manifest) {
            errors.extend(dep_errors);
        }

        if let Some(prefix) = &manifest.router_prefix {
            if prefix.trim_matches('/').is_empty() {
                errors.push("Router prefix cannot be empty or '/'".to_string());
            }
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for module: {}", manifest.id);
            ValidationResult::Valid
        } else {
            warn!(
                "Manifest validation failed for module {}: {:?}",
                manifest.id, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate module id format
    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_len {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().map_or(false, |c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Validate version format (semantic versioning)
    ///
    /// Accepts: major.minor[.patch][-prerelease][+build]
    #[inline]
    fn is_valid_version(&self, version: &str) -> bool {
        if version.is_empty() {
            return false;
        }

        let base = version.split('+').next().unwrap_or(version);
        let version_part = base.split('-').next().unwrap_or(base);

        let nums: Vec<&str> = version_part.split('.').collect();
        if nums.len() < 2 || nums.len() > 3 {
            return false;
        }

        nums.iter()
            .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) && n.parse::<u32>().is_ok())
    }

    /// Validate declared dependencies
    fn validate_dependencies(&self, manifest: &ModuleManifest) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for dep in &manifest.depends {
            if !self.is_valid_name(dep) {
                errors.push(format!("Invalid dependency name: {:?}", dep));
            } else if !manifest.id.is_empty() && *dep == manifest.id {
                errors.push(format!("Module {} cannot depend on itself", manifest.id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}
