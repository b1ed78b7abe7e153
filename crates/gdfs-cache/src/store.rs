//! Typed, namespaced access to a [`KvStore`].
//!
//! Backend failures never escape this layer: a failed read is a miss and a
//! failed write also forgets the key, so it reads back as a miss. Both are
//! logged.

use crate::key::CacheKey;
use crate::kv::KvStore;
use crate::registry::CacheBackends;
use gdfs_core::config::DriveFsConfig;
use gdfs_core::error::Result;
use gdfs_core::types::{ObjectId, RemoteObject};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Object Cache record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedObject {
    pub object: RemoteObject,
    /// Resolved path at the time of caching. A hint, never authoritative.
    #[serde(default)]
    pub absolute_path: Option<String>,
    /// Known child IDs. `None` means unknown; `Some(empty)` means listed and empty.
    #[serde(default)]
    pub children: Option<BTreeSet<ObjectId>>,
}

impl CachedObject {
    pub fn new(object: RemoteObject) -> Self {
        Self { object, absolute_path: None, children: None }
    }

    pub fn at_path(object: RemoteObject, path: impl Into<String>) -> Self {
        Self { object, absolute_path: Some(path.into()), children: None }
    }

    pub fn id(&self) -> &ObjectId {
        &self.object.id
    }

    pub fn children_known(&self) -> bool {
        self.children.is_some()
    }

    /// Adds a child only when the children set is already populated.
    pub fn add_child(&mut self, id: ObjectId) {
        if let Some(children) = self.children.as_mut() {
            children.insert(id);
        }
    }

    pub fn remove_child(&mut self, id: &ObjectId) {
        if let Some(children) = self.children.as_mut() {
            children.remove(id);
        }
    }
}

pub struct CacheStore {
    backend: Arc<dyn KvStore>,
    namespace: String,
    ttl: Option<Duration>,
}

impl CacheStore {
    /// `ttl == None` disables caching: reads miss and writes are no-ops.
    pub fn new(backend: Arc<dyn KvStore>, namespace: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self { backend, namespace: namespace.into(), ttl }
    }

    pub fn from_config(config: &DriveFsConfig, backends: &CacheBackends) -> Result<Self> {
        config.validate()?;
        let backend = backends.get(&config.cache_backend)?;
        Ok(Self::new(backend, config.cache_namespace.clone(), config.cache_ttl()))
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // ========== Object Cache ==========

    pub fn get_object(&self, id: &ObjectId) -> Option<CachedObject> {
        self.read(CacheKey::object(&self.namespace, id.as_str()))
    }

    pub fn put_object(&self, record: &CachedObject) {
        self.write(CacheKey::object(&self.namespace, record.id().as_str()), record);
    }

    pub fn forget_object(&self, id: &ObjectId) {
        self.remove(CacheKey::object(&self.namespace, id.as_str()));
    }

    // ========== Name Cache ==========

    pub fn get_id_for_path(&self, path: &str) -> Option<ObjectId> {
        self.read(CacheKey::path(&self.namespace, path))
    }

    pub fn put_id_for_path(&self, path: &str, id: &ObjectId) {
        self.write(CacheKey::path(&self.namespace, path), id);
    }

    pub fn forget_path(&self, path: &str) {
        self.remove(CacheKey::path(&self.namespace, path));
    }

    // ========== Drive list ==========

    pub fn get_containers(&self) -> Option<Vec<RemoteObject>> {
        self.read(CacheKey::containers(&self.namespace))
    }

    pub fn put_containers(&self, drives: &[RemoteObject]) {
        self.write(CacheKey::containers(&self.namespace), drives);
    }

    pub fn forget_containers(&self) {
        self.remove(CacheKey::containers(&self.namespace));
    }

    // ========== Raw access ==========

    fn read<T: DeserializeOwned>(&self, key: CacheKey<'_>) -> Option<T> {
        self.ttl?;
        let encoded = key.encode();
        let bytes = match self.backend.get(&encoded) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %encoded, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %encoded, error = %e, "dropping undecodable cache entry");
                let _ = self.backend.forget(&encoded);
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: CacheKey<'_>, value: &T) {
        let Some(ttl) = self.ttl else { return };
        let encoded = key.encode();
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %encoded, error = %e, "cache encode failed");
                let _ = self.backend.forget(&encoded);
                return;
            }
        };
        if let Err(e) = self.backend.put(&encoded, bytes, ttl) {
            tracing::warn!(key = %encoded, error = %e, "cache write failed, dropping entry");
            // the previous value must not stay readable
            let _ = self.backend.forget(&encoded);
        }
    }

    fn remove(&self, key: CacheKey<'_>) {
        // Runs even when disabled; a shared backend may hold older entries.
        let encoded = key.encode();
        if let Err(e) = self.backend.forget(&encoded) {
            tracing::warn!(key = %encoded, error = %e, "cache forget failed");
        }
    }
}
