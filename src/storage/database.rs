//! Database abstraction layer
//!
//! Provides a unified key-value interface over the storage engines the host
//! can persist module state to: an in-process map and sled (behind the `sled`
//! feature).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Database abstraction trait
pub trait Database: Send + Sync {
    /// Open a named tree/table
    fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>>;

    /// Flush all pending writes
    fn flush(&self) -> Result<()>;
}

/// Outcome of [`Tree::compare_and_swap`]
pub type Swap = std::result::Result<(), Option<Vec<u8>>>;

/// Named collection of key-value pairs within a database
pub trait Tree: Send + Sync {
    /// Replace the value under `key` only if it currently equals `expected`
    /// (`None` meaning absent). On mismatch nothing is written and the
    /// current value is returned in the inner `Err`.
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<Swap>;

    /// Insert only if the key is absent; returns the existing value otherwise
    fn insert_if_absent(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.compare_and_swap(key, None, value)?.err().flatten())
    }

    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Check if a key exists
    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Get number of entries
    fn len(&self) -> Result<usize>;

    /// Check if tree is empty
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate over all key-value pairs
    fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_>;
}

/// Database backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Sled,
}

/// Create a database instance based on backend type
pub fn create_database<P: AsRef<Path>>(
    data_dir: P,
    backend: DatabaseBackend,
) -> Result<Box<dyn Database>> {
    match backend {
        DatabaseBackend::Memory => Ok(Box::new(MemoryDatabase::new())),
        #[cfg(feature = "sled")]
        DatabaseBackend::Sled => Ok(Box::new(sled_impl::SledDatabase::new(data_dir)?)),
        #[cfg(not(feature = "sled"))]
        DatabaseBackend::Sled => {
            let _ = data_dir;
            Err(anyhow::anyhow!(
                "Sled backend not available (feature not enabled)"
            ))
        }
    }
}

/// Get default database backend
pub fn default_backend() -> DatabaseBackend {
    #[cfg(feature = "sled")]
    {
        DatabaseBackend::Sled
    }
    #[cfg(not(feature = "sled"))]
    {
        DatabaseBackend::Memory
    }
}

type SharedMap = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// In-process database; contents are lost on drop
#[derive(Default)]
pub struct MemoryDatabase {
    trees: RwLock<HashMap<String, SharedMap>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> anyhow::Error {
    anyhow::anyhow!("Memory database lock poisoned")
}

impl Database for MemoryDatabase {
    fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>> {
        let mut trees = self.trees.write().map_err(|_| poisoned())?;
        let map = trees.entry(name.to_string()).or_default();
        Ok(Box::new(MemoryTree {
            map: Arc::clone(map),
        }))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

struct MemoryTree {
    map: SharedMap,
}

impl Tree for MemoryTree {
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<Swap> {
        let mut map = self.map.write().map_err(|_| poisoned())?;
        if map.get(key).map(Vec::as_slice) != expected {
            return Ok(Err(map.get(key).cloned()));
        }
        map.insert(key.to_vec(), new.to_vec());
        Ok(Ok(()))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.map.read().map_err(|_| poisoned())?.len())
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
        // Snapshot so the lock is not held across iteration
        let items: Vec<Result<(Vec<u8>, Vec<u8>)>> = match self.map.read() {
            Ok(map) => map.iter().map(|(k, v)| Ok((k.clone(), v.clone()))).collect(),
            Err(_) => vec![Err(poisoned())],
        };
        Box::new(items.into_iter())
    }
}

// Sled implementation
#[cfg(feature = "sled")]
mod sled_impl {
    use super::{Database, Swap, Tree};
    use anyhow::Result;
    use sled::Db;
    use std::path::Path;
    use std::sync::Arc;

    pub struct SledDatabase {
        db: Arc<Db>,
    }

    impl SledDatabase {
        pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
            let db = sled::open(data_dir)?;
            Ok(Self { db: Arc::new(db) })
        }
    }

    impl Database for SledDatabase {
        fn open_tree(&self, name: &str) -> Result<Box<dyn Tree>> {
            let tree = self.db.open_tree(name)?;
            Ok(Box::new(SledTree {
                tree: Arc::new(tree),
            }))
        }

        fn flush(&self) -> Result<()> {
            self.db.flush()?;
            Ok(())
        }
    }

    struct SledTree {
        tree: Arc<sled::Tree>,
    }

    impl Tree for SledTree {
        fn compare_and_swap(
            &self,
            key: &[u8],
            expected: Option<&[u8]>,
            new: &[u8],
        ) -> Result<Swap> {
            match self.tree.compare_and_swap(key, expected, Some(new))? {
                Ok(()) => Ok(Ok(())),
                Err(conflict) => Ok(Err(conflict.current.map(|v| v.to_vec()))),
            }
        }

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.tree.get(key)?.map(|v| v.to_vec()))
        }

        fn contains_key(&self, key: &[u8]) -> Result<bool> {
            Ok(self.tree.contains_key(key)?)
        }

        fn len(&self) -> Result<usize> {
            Ok(self.tree.len())
        }

        fn iter(&self) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
            Box::new(self.tree.iter().map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| anyhow::anyhow!("Sled iteration error: {}", e))
            }))
        }
    }
}
