//! Configuration management for modhost
//!
//! Handles configuration loading (TOML or JSON by extension) and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::module::registry::dependencies::ResolveOptions;
use crate::storage::database::{default_backend, DatabaseBackend};
use crate::utils::env_opt;

/// Environment variable consulted when the config has no token
pub const TOKEN_ENV: &str = "MODHOST_TOKEN";

/// Module system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// List of enabled modules (empty = every discovered module)
    #[serde(default)]
    pub enabled_modules: Vec<String>,

    /// Modules to disable regardless of their manifest
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Module-specific configuration handed to init hooks
    #[serde(default)]
    pub module_configs: HashMap<String, HashMap<String, String>>,
}

impl ModuleConfig {
    /// Overrides applied before dependency resolution
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            force_disabled: self.disabled.iter().cloned().collect(),
            only: if self.enabled_modules.is_empty() {
                None
            } else {
                Some(self.enabled_modules.iter().cloned().collect())
            },
        }
    }
}

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
        }
    }
}

/// Settings persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: DatabaseBackend,

    /// Data directory for on-disk backends
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_database_path(),
        }
    }
}

/// Where interaction context comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Module providing the fetch/create actions
    #[serde(default = "default_context_provider")]
    pub context_provider: String,

    #[serde(default = "default_fetch_action")]
    pub fetch_action: String,

    #[serde(default = "default_create_action")]
    pub create_action: String,

    /// Gateway event channel capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_context_provider() -> String {
    "settings".to_string()
}

fn default_fetch_action() -> String {
    "getSettings".to_string()
}

fn default_create_action() -> String {
    "createSettings".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            context_provider: default_context_provider(),
            fetch_action: default_fetch_action(),
            create_action: default_create_action(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "modhost::interaction=debug"
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Host configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Platform token; falls back to `MODHOST_TOKEN`
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub modules: ModuleConfig,

    #[serde(default)]
    pub webserver: WebServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub interactions: InteractionConfig,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl HostConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Token from the config, or from the environment
    pub fn token(&self) -> Option<String> {
        self.token.clone().or_else(|| env_opt(TOKEN_ENV))
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.webserver.port == 0 {
            return Err(anyhow::anyhow!(
                "webserver.port must be between 1 and 65535"
            ));
        }

        let interactions = &self.interactions;
        for (field, value) in [
            ("context_provider", &interactions.context_provider),
            ("fetch_action", &interactions.fetch_action),
            ("create_action", &interactions.create_action),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow::anyhow!("interactions.{} must not be empty", field));
            }
        }
        if interactions.queue_capacity == 0 {
            return Err(anyhow::anyhow!(
                "interactions.queue_capacity must be greater than 0"
            ));
        }

        if let Some(id) = self
            .modules
            .disabled
            .iter()
            .find(|id| self.modules.enabled_modules.contains(id))
        {
            return Err(anyhow::anyhow!(
                "module '{}' is listed as both enabled and disabled",
                id
            ));
        }

        Ok(())
    }
}
