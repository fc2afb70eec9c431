//! Settings store implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::database::{Database, Tree};
use super::{SettingsRecord, SettingsStore, StorageError};

/// In-process settings store
#[derive(Default)]
pub struct MemorySettingsStore {
    records: RwLock<HashMap<String, SettingsRecord>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<SettingsRecord>, StorageError> {
        Ok(self.records.read().await.get(tenant_id).cloned())
    }

    async fn create(&self, tenant_id: &str) -> Result<SettingsRecord, StorageError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(tenant_id.to_string())
            .or_insert_with(|| {
                debug!("Creating settings record for tenant {}", tenant_id);
                SettingsRecord::new(tenant_id)
            })
            .clone();
        Ok(record)
    }

    async fn set_value(
        &self,
        tenant_id: &str,
        key: &str,
        value: &str,
    ) -> Result<SettingsRecord, StorageError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(tenant_id)
            .ok_or_else(|| StorageError::NotFound(tenant_id.to_string()))?;
        record.set(key, value);
        Ok(record.clone())
    }
}

const SETTINGS_TREE: &str = "settings";

/// Settings store over a [`Database`] tree, one JSON record per tenant
pub struct TreeSettingsStore {
    db: Arc<dyn Database>,
    tree: Box<dyn Tree>,
}

impl TreeSettingsStore {
    pub fn new(db: Arc<dyn Database>) -> Result<Self, StorageError> {
        let tree = db.open_tree(SETTINGS_TREE)?;
        Ok(Self { db, tree })
    }

    fn decode(tenant_id: &str, bytes: &[u8]) -> Result<SettingsRecord, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| StorageError::Corrupt {
            tenant_id: tenant_id.to_string(),
            reason: e.to_string(),
        })
    }

    fn encode(record: &SettingsRecord) -> Result<Vec<u8>, StorageError> {
        serde_json::to_vec(record).map_err(|e| StorageError::Backend(e.to_string()))
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.tree.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.tree.is_empty()?)
    }
}

#[async_trait]
impl SettingsStore for TreeSettingsStore {
    async fn get(&self, tenant_id: &str) -> Result<Option<SettingsRecord>, StorageError> {
        self.tree
            .get(tenant_id.as_bytes())?
            .map(|bytes| Self::decode(tenant_id, &bytes))
            .transpose()
    }

    async fn create(&self, tenant_id: &str) -> Result<SettingsRecord, StorageError> {
        let record = SettingsRecord::new(tenant_id);
        match self
            .tree
            .insert_if_absent(tenant_id.as_bytes(), &Self::encode(&record)?)?
        {
            Some(existing) => Self::decode(tenant_id, &existing),
            None => {
                debug!("Created settings record {} for tenant {}", record.id, tenant_id);
                Ok(record)
            }
        }
    }

    async fn set_value(
        &self,
        tenant_id: &str,
        key: &str,
        value: &str,
    ) -> Result<SettingsRecord, StorageError> {
        let tenant_key = tenant_id.as_bytes();
        let mut current = self
            .tree
            .get(tenant_key)?
            .ok_or_else(|| StorageError::NotFound(tenant_id.to_string()))?;
        loop {
            let mut record = Self::decode(tenant_id, &current)?;
            record.set(key, value);
            match self
                .tree
                .compare_and_swap(tenant_key, Some(current.as_slice()), &Self::encode(&record)?)?
            {
                Ok(()) => {
                    self.db.flush()?;
                    return Ok(record);
                }
                Err(Some(newer)) => {
                    debug!("Settings for tenant {} changed underneath, retrying", tenant_id);
                    current = newer;
                }
                Err(None) => return Err(StorageError::NotFound(tenant_id.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::MemoryDatabase;

    #[tokio::test]
    async fn memory_store_creates_once() {
        let store = MemorySettingsStore::new();
        assert!(store.get("g").await.unwrap().is_none());
        let first = store.create("g").await.unwrap();
        let second = store.create("g").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn tree_store_round_trips_values() {
        let store = TreeSettingsStore::new(Arc::new(MemoryDatabase::new())).unwrap();
        let record = store.create("g").await.unwrap();
        store.set_value("g", "logChannel", "42").await.unwrap();

        let loaded = store.get("g").await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.get("logChannel"), Some("42"));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn tree_store_rejects_writes_without_create() {
        let store = TreeSettingsStore::new(Arc::new(MemoryDatabase::new())).unwrap();
        let err = store.set_value("ghost", "k", "v").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn tree_store_keeps_writes_to_different_keys() {
        let store = TreeSettingsStore::new(Arc::new(MemoryDatabase::new())).unwrap();
        store.create("g").await.unwrap();

        let (a, b) = tokio::join!(
            store.set_value("g", "logChannel", "1"),
            store.set_value("g", "staffRole", "2"),
        );
        a.unwrap();
        b.unwrap();

        let loaded = store.get("g").await.unwrap().unwrap();
        assert_eq!(loaded.get("logChannel"), Some("1"));
        assert_eq!(loaded.get("staffRole"), Some("2"));
    }

    #[tokio::test]
    async fn memory_store_set_value_returns_updated_record() {
        let store = MemorySettingsStore::new();
        assert!(matches!(
            store.set_value("g", "k", "v").await,
            Err(StorageError::NotFound(_))
        ));

        let created = store.create("g").await.unwrap();
        let updated = store.set_value("g", "k", "v").await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.get("k"), Some("v"));
        assert_eq!(store.get("g").await.unwrap().unwrap(), updated);
    }
}
