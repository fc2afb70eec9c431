//! Storage layer
//!
//! Persists per-tenant settings records. Backed by any [`Database`] via
//! [`TreeSettingsStore`], or kept in process by [`MemorySettingsStore`].

pub mod database;
pub mod settings_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::utils::current_timestamp;
use database::{create_database, DatabaseBackend};

pub use settings_store::{MemorySettingsStore, TreeSettingsStore};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Corrupt settings record for tenant {tenant_id}: {reason}")]
    Corrupt { tenant_id: String, reason: String },

    #[error("No settings record for tenant {0}")]
    NotFound(String),
}

impl From<anyhow::Error> for StorageError {
    fn from(e: anyhow::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Per-tenant settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Record id, distinct from the tenant id
    pub id: Uuid,
    pub tenant_id: String,
    /// Stored values keyed by setting key
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    /// Unix seconds
    pub created_at: u64,
    /// Unix seconds
    pub updated_at: u64,
}

impl SettingsRecord {
    /// Fresh record with no values set
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let now = current_timestamp();
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            values: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value and bump `updated_at`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
        self.updated_at = current_timestamp();
    }
}

/// Persistent settings boundary
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Record for a tenant, if one exists
    async fn get(&self, tenant_id: &str) -> Result<Option<SettingsRecord>, StorageError>;

    /// Create the tenant's record; returns the existing one if another
    /// caller created it first
    async fn create(&self, tenant_id: &str) -> Result<SettingsRecord, StorageError>;

    /// Set one value on the tenant's stored record and return the result.
    ///
    /// The read-modify-write is atomic per tenant, so concurrent writes to
    /// different keys never drop each other. Fails with `NotFound` when the
    /// tenant has no record yet.
    async fn set_value(
        &self,
        tenant_id: &str,
        key: &str,
        value: &str,
    ) -> Result<SettingsRecord, StorageError>;
}

/// Open the settings store described by the configuration
pub fn open_settings_store(config: &DatabaseConfig) -> Result<Arc<dyn SettingsStore>, StorageError> {
    match config.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory settings store");
            Ok(Arc::new(MemorySettingsStore::new()))
        }
        backend => {
            info!(
                "Opening {:?} settings store at {}",
                backend,
                config.path.display()
            );
            let db = create_database(&config.path, backend)?;
            Ok(Arc::new(TreeSettingsStore::new(Arc::from(db))?))
        }
    }
}
