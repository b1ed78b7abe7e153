//! Remote mutations and the cache updates that follow them.
//!
//! Every cache write here happens after its remote call succeeded, so a
//! failure part way through a multi-step mutation leaves the cache matching
//! whatever the remote actually holds.

use crate::tree::{DriveTree, Resolved};
use gdfs_cache::CachedObject;
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::path;
use gdfs_core::types::{NewObject, ObjectChanges, ObjectId, ObjectKind, RemoteObject};
use std::collections::BTreeSet;

impl DriveTree {
    // ========== Cache effects ==========

    /// Record `object`, just created under `parent`.
    pub fn record_created(&self, parent: &Resolved, object: RemoteObject) -> Resolved {
        let child_path = path::join(&parent.path, &object.name);
        // a new container is known to be empty
        let children = object.is_container().then(BTreeSet::new);
        self.cache().put_object(&CachedObject {
            object: object.clone(),
            absolute_path: Some(child_path.clone()),
            children,
        });
        self.cache().put_id_for_path(&child_path, &object.id);
        self.attach_child(parent.id(), &object.id);
        Resolved::new(child_path, object)
    }

    /// Refresh the record of an object whose path did not change.
    pub fn record_updated(&self, target: &Resolved, object: RemoteObject) -> Resolved {
        self.remember(&object, &target.path);
        Resolved::new(target.path.clone(), object)
    }

    /// Record that `from` now lives at `new_parent_path/<object.name>`.
    pub fn record_moved(
        &self,
        from: &Resolved,
        new_parent_path: &str,
        new_parent_id: &ObjectId,
        object: RemoteObject,
    ) -> Resolved {
        let new_path = path::join(new_parent_path, &object.name);
        if let Some(children) = self.cache().get_object(from.id()).and_then(|r| r.children) {
            // descendant paths changed with this one
            for child in &children {
                self.invalidate_subtree(child);
            }
        }
        self.forget_path_if(&from.path, from.id());
        if let Some(old_parent) = from.object.parent_id() {
            self.detach_child(old_parent, from.id());
        }
        self.cache()
            .put_object(&CachedObject::at_path(object.clone(), new_path.clone()));
        self.cache().put_id_for_path(&new_path, &object.id);
        self.attach_child(new_parent_id, &object.id);
        Resolved::new(new_path, object)
    }

    /// Record that `target` and everything below it is gone.
    pub fn record_deleted(&self, target: &Resolved) {
        if let Some(parent) = target.object.parent_id() {
            self.detach_child(parent, target.id());
        }
        self.invalidate_subtree(target.id());
        self.forget_path_if(&target.path, target.id());
    }

    /// Drop Object Cache and Name Cache entries for `id` and every cached
    /// descendant, following known children sets.
    pub fn invalidate_subtree(&self, id: &ObjectId) {
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(record) = self.cache().get_object(&next) {
                if let Some(children) = record.children {
                    stack.extend(children);
                }
                if let Some(p) = record.absolute_path {
                    self.forget_path_if(&p, &next);
                }
            }
            self.cache().forget_object(&next);
        }
    }

    fn attach_child(&self, parent_id: &ObjectId, child: &ObjectId) {
        if let Some(mut record) = self.cache().get_object(parent_id) {
            if record.children_known() {
                record.add_child(child.clone());
                self.cache().put_object(&record);
            }
        }
    }

    fn detach_child(&self, parent_id: &ObjectId, child: &ObjectId) {
        if let Some(mut record) = self.cache().get_object(parent_id) {
            if record.children_known() {
                record.remove_child(child);
                self.cache().put_object(&record);
            }
        }
    }

    // ========== Existence checks ==========

    /// Look up `name` under `parent`, re-verified against the remote.
    ///
    /// A cached hit is confirmed with `get_by_id`; a miss re-lists the parent.
    /// Stale cache state found along the way is repaired.
    pub async fn verify_child(&self, parent: &Resolved, name: &str) -> Result<Option<Resolved>> {
        let child_path = path::join(&parent.path, name);
        if let Some(record) = self.cached_at(&child_path) {
            let cached = Resolved::new(child_path.clone(), record.object);
            match self.remote().get_by_id(cached.id()).await {
                Ok(fresh)
                    if !fresh.trashed
                        && fresh.name == name
                        && fresh.parent_ids.contains(parent.id()) =>
                {
                    return Ok(Some(self.record_updated(&cached, fresh)));
                }
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
            tracing::warn!(path = %child_path, id = %cached.id(), "cached entry is stale, repairing");
            self.record_deleted(&cached);
        }
        let children = match self.refresh_children(parent).await {
            Ok(children) => children,
            Err(e) if e.is_not_found() => {
                tracing::warn!(path = %parent.path, "cached parent vanished remotely");
                self.record_deleted(parent);
                return Err(GdfsError::not_found(parent.path.clone()));
            }
            Err(e) => return Err(e),
        };
        let found = children.into_iter().find(|c| c.object.name == name);
        if let Some(existing) = &found {
            tracing::debug!(path = %existing.path, id = %existing.id(), "found remotely during re-check");
        }
        Ok(found)
    }

    // ========== Mutations ==========

    /// Create a child of `parent` after checking the name is free.
    pub async fn create_child(
        &self,
        parent: &Resolved,
        name: &str,
        is_container: bool,
        metadata: &NewObject,
    ) -> Result<Resolved> {
        ensure_accepts_children(parent)?;
        if let Some(existing) = self.verify_child(parent, name).await? {
            return Err(GdfsError::ConflictingState(format!("{} already exists", existing.path)));
        }
        let object = self
            .remote()
            .create(parent.id(), name, is_container, metadata)
            .await?;
        let created = self.record_created(parent, object);
        tracing::info!(path = %created.path, id = %created.id(), is_container, "created");
        Ok(created)
    }

    /// Create every missing directory on `path`, top-down. Existing
    /// directories are reused, so repeated calls are idempotent.
    pub async fn create_directory_all(&self, path: &str) -> Result<Resolved> {
        let path = path::normalize(path)?;
        let walk = self.walk(&path).await?;
        let mut current = walk.deepest;
        if !current.object.is_container() {
            return Err(GdfsError::ConflictingState(format!("{} is a file", current.path)));
        }
        for name in &walk.missing {
            current = self.ensure_directory(&current, name).await?;
        }
        Ok(current)
    }

    async fn ensure_directory(&self, parent: &Resolved, name: &str) -> Result<Resolved> {
        ensure_accepts_children(parent)?;
        match self.verify_child(parent, name).await? {
            Some(existing) if existing.object.is_container() => Ok(existing),
            Some(existing) => Err(GdfsError::ConflictingState(format!("{} is a file", existing.path))),
            None => {
                let folder = self
                    .remote()
                    .create(parent.id(), name, true, &NewObject::folder())
                    .await?;
                let created = self.record_created(parent, folder);
                tracing::info!(path = %created.path, id = %created.id(), "created directory");
                Ok(created)
            }
        }
    }

    /// Rename and/or reparent `from` to `new_parent/new_name`. The object ID
    /// is preserved.
    pub async fn move_object(&self, from: &Resolved, new_parent: &Resolved, new_name: &str) -> Result<Resolved> {
        ensure_movable(from)?;
        ensure_accepts_children(new_parent)?;
        if let Some(existing) = self.verify_child(new_parent, new_name).await? {
            if existing.id() == from.id() {
                return Ok(existing);
            }
            return Err(GdfsError::ConflictingState(format!("{} already exists", existing.path)));
        }
        let old_parent_id = from
            .object
            .parent_id()
            .cloned()
            .ok_or_else(|| GdfsError::InvalidArgument(format!("{} has no parent", from.path)))?;
        let old_parent_path = path::parent_and_name(&from.path)
            .map(|(p, _)| p)
            .unwrap_or_else(|| path::ROOT.to_string());

        let mut object = from.object.clone();
        if new_name != from.object.name {
            object = self
                .remote()
                .update_metadata(from.id(), &ObjectChanges::rename(new_name))
                .await?;
        }
        if &old_parent_id != new_parent.id() {
            match self.remote().reparent(from.id(), &old_parent_id, new_parent.id()).await {
                Ok(moved) => object = moved,
                Err(e) => {
                    if object.name != from.object.name {
                        // renamed in place; the cache must say so
                        self.record_moved(from, &old_parent_path, &old_parent_id, object);
                    }
                    return Err(e);
                }
            }
        }
        let moved = self.record_moved(from, &new_parent.path, new_parent.id(), object);
        tracing::info!(from = %from.path, to = %moved.path, id = %moved.id(), "moved");
        Ok(moved)
    }

    /// Copy a file to `dest_parent/new_name`.
    pub async fn copy_object(&self, src: &Resolved, dest_parent: &Resolved, new_name: &str) -> Result<Resolved> {
        if src.object.is_container() {
            return Err(GdfsError::InvalidArgument(format!("cannot copy directory {}", src.path)));
        }
        ensure_accepts_children(dest_parent)?;
        if let Some(existing) = self.verify_child(dest_parent, new_name).await? {
            return Err(GdfsError::ConflictingState(format!("{} already exists", existing.path)));
        }
        let copy = self
            .remote()
            .copy(src.id(), dest_parent.id(), new_name, &ObjectChanges::default())
            .await?;
        let created = self.record_created(dest_parent, copy);
        tracing::info!(from = %src.path, to = %created.path, id = %created.id(), "copied");
        Ok(created)
    }

    /// Trash or permanently delete `target` and drop its cached subtree.
    pub async fn delete_object(&self, target: &Resolved, permanent: bool) -> Result<()> {
        ensure_movable(target)?;
        match self.remote().delete(target.id(), permanent).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                // already gone remotely
                self.record_deleted(target);
                return Err(GdfsError::not_found(target.path.clone()));
            }
            Err(e) => return Err(e),
        }
        self.record_deleted(target);
        tracing::info!(path = %target.path, id = %target.id(), permanent, "deleted");
        Ok(())
    }
}

fn ensure_accepts_children(parent: &Resolved) -> Result<()> {
    if !parent.object.is_container() {
        return Err(GdfsError::ConflictingState(format!("{} is a file", parent.path)));
    }
    if parent.object.kind == ObjectKind::Root {
        return Err(GdfsError::InvalidArgument(
            "drives cannot be created or modified through the filesystem".into(),
        ));
    }
    Ok(())
}

/// Root and drives are fixed.
pub(crate) fn ensure_movable(target: &Resolved) -> Result<()> {
    if target.is_root() || matches!(target.object.kind, ObjectKind::Root | ObjectKind::Drive) {
        return Err(GdfsError::InvalidArgument(format!("cannot modify {}", display_path(target))));
    }
    Ok(())
}

fn display_path(target: &Resolved) -> &str {
    if target.is_root() {
        "the root"
    } else {
        &target.path
    }
}
