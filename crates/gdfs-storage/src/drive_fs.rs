//! DriveFs: path-addressed filesystem façade over a [`DriveTree`].
//!
//! Every entry point normalises its path, resolves it through the caches and
//! falls back to the remote only for what the caches cannot answer.

use crate::propagator::ensure_movable;
use crate::tree::{DriveTree, Resolved, RootScope};
use chrono::{DateTime, Utc};
use gdfs_cache::{CacheBackends, CacheStore};
use gdfs_core::config::DriveFsConfig;
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::path;
use gdfs_core::types::{NewObject, ObjectId, ObjectKind, RemoteObject};
use gdfs_remote::{ByteStream, RemoteObjectService};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on the buffer reserved up front by `read`.
const READ_CAPACITY_HINT_MAX: usize = 8 * 1024 * 1024;

/// One entry returned by [`DriveFs::list_directory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub path: String,
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    /// `dir` or `file`.
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub size: u64,
    pub created_time: DateTime<Utc>,
}

impl ListingEntry {
    pub fn is_dir(&self) -> bool {
        self.kind.is_container()
    }
}

impl From<&Resolved> for ListingEntry {
    fn from(r: &Resolved) -> Self {
        Self {
            path: r.path.clone(),
            id: r.object.id.clone(),
            name: r.object.name.clone(),
            kind: r.object.kind,
            entry_type: r.object.kind.as_str(),
            size: r.object.size,
            created_time: r.object.created_time,
        }
    }
}

pub struct DriveFs {
    tree: DriveTree,
    trash_on_delete: bool,
}

impl DriveFs {
    /// Build over `remote` with the built-in cache backends.
    pub fn new(remote: Arc<dyn RemoteObjectService>, config: &DriveFsConfig) -> Result<Self> {
        Self::with_backends(remote, config, &CacheBackends::new())
    }

    /// Build over `remote`, picking the cache backend named by the config
    /// from `backends`. Instances sharing a backend stay isolated by
    /// `cache_namespace`.
    pub fn with_backends(
        remote: Arc<dyn RemoteObjectService>,
        config: &DriveFsConfig,
        backends: &CacheBackends,
    ) -> Result<Self> {
        let cache = CacheStore::from_config(config, backends)?;
        let scope = RootScope::from_config(config);
        tracing::info!(
            namespace = %config.cache_namespace,
            backend = %config.cache_backend,
            ttl_seconds = config.cache_ttl_seconds,
            scope = ?scope,
            "drive filesystem ready"
        );
        Ok(Self {
            tree: DriveTree::new(remote, cache, scope),
            trash_on_delete: config.trash_on_delete,
        })
    }

    pub fn tree(&self) -> &DriveTree {
        &self.tree
    }

    // ========== Queries ==========

    pub async fn resolve(&self, path: &str) -> Result<ObjectId> {
        self.tree.resolve(path).await
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.tree.lookup(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remote record for `path`.
    pub async fn stat(&self, path: &str) -> Result<RemoteObject> {
        Ok(self.tree.lookup(path).await?.object)
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.file_at(path).await?;
        let mut stream = self.open(&target).await?;
        let hint = usize::try_from(target.object.size).unwrap_or(0).min(READ_CAPACITY_HINT_MAX);
        let mut buf = Vec::with_capacity(hint);
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| GdfsError::RemoteUnavailable(format!("read {}: {e}", target.path)))?;
        Ok(buf)
    }

    pub async fn open_read_stream(&self, path: &str) -> Result<ByteStream> {
        let target = self.file_at(path).await?;
        self.open(&target).await
    }

    /// Entries below `path`; with `recursive`, the whole subtree.
    pub async fn list_directory(&self, path: &str, recursive: bool) -> Result<Vec<ListingEntry>> {
        let dir = self.tree.lookup(path).await?;
        if !dir.object.is_container() {
            return Err(GdfsError::InvalidArgument(format!("not a directory: {}", dir.path)));
        }
        let mut out = Vec::new();
        self.collect(&dir, recursive, &mut out).await?;
        Ok(out)
    }

    #[async_recursion::async_recursion]
    async fn collect(&self, dir: &Resolved, recursive: bool, out: &mut Vec<ListingEntry>) -> Result<()> {
        for child in self.tree.list_children(dir).await? {
            out.push(ListingEntry::from(&child));
            if recursive && child.object.is_container() {
                self.collect(&child, true, out).await?;
            }
        }
        Ok(())
    }

    // ========== Metadata ==========

    pub async fn get_metadata(&self, path: &str) -> Result<Map<String, Value>> {
        let target = self.tree.lookup(path).await?;
        Ok(target.object.to_metadata(&target.path))
    }

    pub async fn get_size(&self, path: &str) -> Result<u64> {
        Ok(self.stat(path).await?.size)
    }

    pub async fn get_mime_type(&self, path: &str) -> Result<String> {
        Ok(self.stat(path).await?.mime_type)
    }

    /// Last modification as Unix seconds.
    pub async fn get_modified_timestamp(&self, path: &str) -> Result<i64> {
        Ok(self.stat(path).await?.modified_time.timestamp())
    }

    // ========== Writes ==========

    /// Create or overwrite the file at `path`, creating missing parents.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = path::normalize(path)?;
        let (target, created) = self.file_for_write(&path).await?;
        if created && data.is_empty() {
            tracing::debug!(path = %target.path, "empty content, upload skipped");
            return Ok(());
        }
        self.upload(&target, data.to_vec()).await
    }

    pub async fn write_stream<R>(&self, path: &str, stream: R) -> Result<()>
    where
        R: AsyncRead + Send + Unpin,
    {
        let data = drain(stream).await?;
        self.write(path, &data).await
    }

    /// Replace the content of an existing file.
    pub async fn update(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.file_at(path).await?;
        self.upload(&target, data.to_vec()).await
    }

    pub async fn update_stream<R>(&self, path: &str, stream: R) -> Result<()>
    where
        R: AsyncRead + Send + Unpin,
    {
        let data = drain(stream).await?;
        self.update(path, &data).await
    }

    /// Move `path` to `new_path`, creating missing destination parents.
    /// The object keeps its ID.
    pub async fn rename(&self, path: &str, new_path: &str) -> Result<()> {
        let from_path = path::normalize(path)?;
        let to_path = path::normalize(new_path)?;
        let from = self.tree.lookup(&from_path).await?;
        ensure_movable(&from)?;
        if from_path == to_path {
            return Ok(());
        }
        if path::is_descendant(&to_path, &from_path) {
            return Err(GdfsError::InvalidArgument(format!(
                "cannot move {from_path} below itself"
            )));
        }
        let (parent_path, name) = split(&to_path)?;
        let new_parent = self.tree.create_directory_all(&parent_path).await?;
        self.tree.move_object(&from, &new_parent, &name).await?;
        Ok(())
    }

    /// Copy the file at `path` to `new_path`, creating missing parents.
    pub async fn copy(&self, path: &str, new_path: &str) -> Result<()> {
        let src = self.file_at(path).await?;
        let to_path = path::normalize(new_path)?;
        let (parent_path, name) = split(&to_path)?;
        let dest_parent = self.tree.create_directory_all(&parent_path).await?;
        self.tree.copy_object(&src, &dest_parent, &name).await?;
        Ok(())
    }

    /// Delete the file at `path`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let target = self.file_at(path).await?;
        self.tree.delete_object(&target, !self.trash_on_delete).await
    }

    /// Delete the directory at `path` with everything below it.
    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        let target = self.tree.lookup(path).await?;
        if !target.object.is_container() {
            return Err(GdfsError::InvalidArgument(format!("not a directory: {}", target.path)));
        }
        self.tree.delete_object(&target, !self.trash_on_delete).await
    }

    /// Create `path` and any missing parents. Succeeds if it already exists.
    pub async fn create_directory(&self, path: &str) -> Result<()> {
        self.tree.create_directory_all(path).await?;
        Ok(())
    }

    /// Drop cached state for `path` and everything below it.
    pub fn invalidate(&self, path: &str) -> Result<()> {
        let path = path::normalize(path)?;
        if path::is_root(&path) {
            for drive in self.tree.cache().get_containers().unwrap_or_default() {
                self.tree.invalidate_subtree(&drive.id);
            }
            self.tree.cache().forget_containers();
        }
        if let Some(id) = self.tree.cache().get_id_for_path(&path) {
            self.tree.invalidate_subtree(&id);
            self.tree.cache().forget_path(&path);
        }
        tracing::debug!(path = %path, "invalidated");
        Ok(())
    }

    // ========== Helpers ==========

    async fn file_at(&self, path: &str) -> Result<Resolved> {
        let target = self.tree.lookup(path).await?;
        if target.object.is_container() {
            return Err(GdfsError::InvalidArgument(format!("is a directory: {}", target.path)));
        }
        Ok(target)
    }

    /// The file `write` should fill: the existing one, or a new empty one
    /// (flagged `true`).
    async fn file_for_write(&self, path: &str) -> Result<(Resolved, bool)> {
        let (parent_path, name) = split(path)?;
        let parent = self.tree.create_directory_all(&parent_path).await?;
        if parent.object.kind == ObjectKind::Root {
            return Err(GdfsError::InvalidArgument(format!(
                "files cannot be stored next to drives: {path}"
            )));
        }
        match self.tree.verify_child(&parent, &name).await? {
            Some(existing) if existing.object.is_container() => Err(GdfsError::ConflictingState(
                format!("{} is a directory", existing.path),
            )),
            Some(existing) => {
                tracing::debug!(path = %existing.path, id = %existing.id(), "overwriting existing file");
                Ok((existing, false))
            }
            None => {
                let object = self
                    .tree
                    .remote()
                    .create(parent.id(), &name, false, &NewObject::file(&name))
                    .await?;
                let created = self.tree.record_created(&parent, object);
                tracing::info!(path = %created.path, id = %created.id(), "created file");
                Ok((created, true))
            }
        }
    }

    async fn upload(&self, target: &Resolved, data: Vec<u8>) -> Result<()> {
        let size = data.len() as u64;
        let body: ByteStream = Box::new(std::io::Cursor::new(data));
        let updated = self
            .tree
            .remote()
            .upload(target.id(), body, size)
            .await
            .map_err(|e| self.gone(target, e))?;
        self.tree.record_updated(target, updated);
        tracing::debug!(path = %target.path, size, "uploaded");
        Ok(())
    }

    async fn open(&self, target: &Resolved) -> Result<ByteStream> {
        self.tree
            .remote()
            .open_read_stream(target.id())
            .await
            .map_err(|e| self.gone(target, e))
    }

    /// A cached target the remote no longer knows: repair and report the path.
    fn gone(&self, target: &Resolved, e: GdfsError) -> GdfsError {
        if e.is_not_found() {
            tracing::warn!(path = %target.path, id = %target.id(), "cached object vanished remotely");
            self.tree.record_deleted(target);
            return e.at_path(&target.path);
        }
        e
    }
}

fn split(path: &str) -> Result<(String, String)> {
    path::parent_and_name(path)
        .ok_or_else(|| GdfsError::InvalidArgument("the root cannot be a file target".into()))
}

async fn drain<R: AsyncRead + Send + Unpin>(mut stream: R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .map_err(|e| GdfsError::InvalidArgument(format!("unreadable input stream: {e}")))?;
    Ok(buf)
}
