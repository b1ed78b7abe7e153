use crate::kv::{KvStore, MemoryKvStore};
use gdfs_core::config::DEFAULT_CACHE_BACKEND;
use gdfs_core::error::{GdfsError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Named cache backend instances that configuration can select from.
///
/// Adapters sharing one registry share backends; their keys stay apart
/// through the configured namespace.
#[derive(Clone)]
pub struct CacheBackends {
    backends: HashMap<String, Arc<dyn KvStore>>,
}

impl CacheBackends {
    /// Registry holding only the default in-memory backend.
    pub fn new() -> Self {
        let mut backends: HashMap<String, Arc<dyn KvStore>> = HashMap::new();
        backends.insert(DEFAULT_CACHE_BACKEND.into(), Arc::new(MemoryKvStore::new()));
        Self { backends }
    }

    /// Register (or replace) a backend under `name`.
    pub fn register(&mut self, name: impl Into<String>, store: Arc<dyn KvStore>) -> &mut Self {
        self.backends.insert(name.into(), store);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn KvStore>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| GdfsError::InvalidConfig(format!("unknown cache backend: {name}")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CacheBackends {
    fn default() -> Self {
        Self::new()
    }
}
