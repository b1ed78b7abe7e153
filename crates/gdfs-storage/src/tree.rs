use gdfs_cache::{CacheStore, CachedObject};
use gdfs_core::config::DriveFsConfig;
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::path;
use gdfs_core::types::{ObjectId, RemoteObject};
use gdfs_remote::RemoteObjectService;
use std::sync::Arc;

/// What `/` stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootScope {
    /// Synthetic root whose children are all visible drives.
    AllDrives,
    /// A single drive mounted at `/`.
    Drive(ObjectId),
}

impl RootScope {
    pub fn from_config(config: &DriveFsConfig) -> Self {
        match &config.root_id {
            Some(id) => RootScope::Drive(ObjectId::new(id.clone())),
            None => RootScope::AllDrives,
        }
    }

    pub fn root_id(&self) -> ObjectId {
        match self {
            RootScope::AllDrives => ObjectId::root(),
            RootScope::Drive(id) => id.clone(),
        }
    }
}

/// A normalised path bound to the object it resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub path: String,
    pub object: RemoteObject,
}

impl Resolved {
    pub fn new(path: impl Into<String>, object: RemoteObject) -> Self {
        Self { path: path.into(), object }
    }

    pub fn id(&self) -> &ObjectId {
        &self.object.id
    }

    pub fn is_root(&self) -> bool {
        path::is_root(&self.path)
    }
}

/// Path resolution and cache maintenance over a remote object service.
///
/// Each operation runs its remote calls sequentially and writes the cache
/// only after the matching remote call succeeded. There is no locking:
/// concurrent callers sharing a backend may race.
pub struct DriveTree {
    remote: Arc<dyn RemoteObjectService>,
    cache: CacheStore,
    scope: RootScope,
}

impl DriveTree {
    pub fn new(remote: Arc<dyn RemoteObjectService>, cache: CacheStore, scope: RootScope) -> Self {
        Self { remote, cache, scope }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteObjectService> {
        &self.remote
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn scope(&self) -> &RootScope {
        &self.scope
    }

    /// The object bound to `/`.
    pub async fn root(&self) -> Result<Resolved> {
        let id = match &self.scope {
            RootScope::AllDrives => return Ok(Resolved::new(path::ROOT, RemoteObject::root())),
            RootScope::Drive(id) => id,
        };
        if let Some(record) = self.cache.get_object(id) {
            return Ok(Resolved::new(path::ROOT, record.object));
        }
        let drive = self.remote.get_by_id(id).await.map_err(|e| {
            if e.is_not_found() {
                GdfsError::InvalidConfig(format!("root {id} does not exist"))
            } else {
                e
            }
        })?;
        if !drive.is_container() || drive.trashed {
            return Err(GdfsError::InvalidConfig(format!("root {id} is not a live container")));
        }
        self.remember(&drive, path::ROOT);
        Ok(Resolved::new(path::ROOT, drive))
    }

    /// Store `object` at `path` in both caches.
    ///
    /// A known children set survives only if the cached path is unchanged.
    pub(crate) fn remember(&self, object: &RemoteObject, path: &str) {
        let children = self
            .cache
            .get_object(&object.id)
            .filter(|r| r.absolute_path.as_deref() == Some(path))
            .and_then(|r| r.children);
        self.cache.put_object(&CachedObject {
            object: object.clone(),
            absolute_path: Some(path.to_string()),
            children,
        });
        self.cache.put_id_for_path(path, &object.id);
    }

    /// Name Cache lookup, trusted only while the Object Cache agrees and
    /// every cached ancestor still lists the entry as its child.
    pub(crate) fn cached_at(&self, path: &str) -> Option<CachedObject> {
        let record = self.backed_record(path)?;
        if !self.ancestors_hold(path, record.id()) {
            tracing::debug!(path, id = %record.id(), "ancestor chain not cached, treating as miss");
            return None;
        }
        Some(record)
    }

    fn backed_record(&self, path: &str) -> Option<CachedObject> {
        let id = self.cache.get_id_for_path(path)?;
        match self.cache.get_object(&id) {
            Some(record) if record.absolute_path.as_deref() == Some(path) && !record.object.trashed => {
                Some(record)
            }
            _ => {
                tracing::debug!(path, id = %id, "discarding unbacked name cache entry");
                self.cache.forget_path(path);
                None
            }
        }
    }

    /// Walk from `path` up to `/`, requiring each parent to be cached at its
    /// path with a populated children set that contains the child below it.
    fn ancestors_hold(&self, path: &str, id: &ObjectId) -> bool {
        let mut child_path = path.to_string();
        let mut child_id = id.clone();
        while let Some((parent_path, _)) = path::parent_and_name(&child_path) {
            if path::is_root(&parent_path) && self.scope == RootScope::AllDrives {
                return self
                    .cache
                    .get_containers()
                    .is_some_and(|drives| drives.iter().any(|d| d.id == child_id));
            }
            let Some(parent) = self.backed_record(&parent_path) else {
                return false;
            };
            if !parent.children.as_ref().is_some_and(|c| c.contains(&child_id)) {
                return false;
            }
            child_id = parent.object.id;
            child_path = parent_path;
        }
        true
    }

    /// Forget `path` only while it still maps to `id`.
    pub(crate) fn forget_path_if(&self, path: &str, id: &ObjectId) {
        if self.cache.get_id_for_path(path).as_ref() == Some(id) {
            self.cache.forget_path(path);
        }
    }
}
