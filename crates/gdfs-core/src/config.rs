use crate::error::{GdfsError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SECONDS: i64 = 3600;
pub const DEFAULT_CACHE_BACKEND: &str = "memory";

/// Adapter configuration.
///
/// Field names accept both snake_case and the camelCase spelling used by
/// adapter option maps (`rootId`, `cacheNamespace`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFsConfig {
    /// Drive that acts as `/`. When unset, `/` lists every drive.
    #[serde(default, alias = "rootId")]
    pub root_id: Option<String>,
    /// Isolates this instance's keys in a shared cache backend.
    #[serde(default = "default_namespace", alias = "cacheNamespace")]
    pub cache_namespace: String,
    /// Zero or negative disables caching.
    #[serde(default = "default_ttl", alias = "cacheTtlSeconds")]
    pub cache_ttl_seconds: i64,
    #[serde(default = "default_backend", alias = "cacheBackend")]
    pub cache_backend: String,
    #[serde(default = "default_trash", alias = "trashOnDelete")]
    pub trash_on_delete: bool,
}

fn default_namespace() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_ttl() -> i64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_backend() -> String {
    DEFAULT_CACHE_BACKEND.into()
}

fn default_trash() -> bool {
    true
}

impl Default for DriveFsConfig {
    fn default() -> Self {
        Self {
            root_id: None,
            cache_namespace: default_namespace(),
            cache_ttl_seconds: default_ttl(),
            cache_backend: default_backend(),
            trash_on_delete: default_trash(),
        }
    }
}

impl DriveFsConfig {
    /// Parse and validate a JSON option map.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_namespace.trim().is_empty() {
            return Err(GdfsError::InvalidConfig("cache_namespace must not be empty".into()));
        }
        if self.cache_backend.trim().is_empty() {
            return Err(GdfsError::InvalidConfig("cache_backend must not be empty".into()));
        }
        if matches!(self.root_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(GdfsError::InvalidConfig("root_id must not be empty when set".into()));
        }
        Ok(())
    }

    /// Entry lifetime, or `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_seconds > 0 {
            Some(Duration::from_secs(self.cache_ttl_seconds as u64))
        } else {
            None
        }
    }

    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = namespace.into();
        self
    }

    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = Some(root_id.into());
        self
    }

    pub fn with_trash_on_delete(mut self, trash: bool) -> Self {
        self.trash_on_delete = trash;
        self
    }
}
