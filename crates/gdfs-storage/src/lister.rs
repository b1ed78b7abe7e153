//! Directory listing with Object Cache maintenance.

use crate::tree::{DriveTree, Resolved};
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::path;
use gdfs_core::types::{ObjectId, RemoteObject};
use std::collections::{BTreeSet, HashSet};

impl DriveTree {
    /// Children of `container`.
    ///
    /// Served from the cache when the container's children set is known and
    /// every child record is still cached; otherwise listed from the remote.
    pub async fn list_children(&self, container: &Resolved) -> Result<Vec<Resolved>> {
        if !container.object.is_container() {
            return Err(GdfsError::InvalidArgument(format!("not a directory: {}", container.path)));
        }
        if container.id().is_root() {
            return self.list_drives(false).await;
        }
        if let Some(children) = self.cached_children(container.id()) {
            tracing::debug!(path = %container.path, count = children.len(), "children cache hit");
            return Ok(children);
        }
        self.fetch_children(container).await
    }

    /// Re-list `container` from the remote, dropping cached state for
    /// children that are gone.
    pub async fn refresh_children(&self, container: &Resolved) -> Result<Vec<Resolved>> {
        if container.id().is_root() {
            return self.list_drives(true).await;
        }
        self.fetch_children(container).await
    }

    async fn list_drives(&self, refresh: bool) -> Result<Vec<Resolved>> {
        if !refresh {
            if let Some(drives) = self.cache().get_containers() {
                return Ok(drives
                    .into_iter()
                    .map(|d| Resolved::new(path::join(path::ROOT, &d.name), d))
                    .collect());
            }
        }
        let drives = self.remote().list_containers().await?;
        tracing::debug!(count = drives.len(), "listed drives from remote");
        self.cache().put_containers(&drives);
        Ok(self.remember_listing(path::ROOT, drives))
    }

    fn cached_children(&self, id: &ObjectId) -> Option<Vec<Resolved>> {
        let ids = self.cache().get_object(id)?.children?;
        let mut out = Vec::with_capacity(ids.len());
        for child in &ids {
            let record = self.cache().get_object(child)?;
            out.push(Resolved::new(record.absolute_path?, record.object));
        }
        out.sort_by(|a, b| a.object.name.cmp(&b.object.name));
        Some(out)
    }

    async fn fetch_children(&self, container: &Resolved) -> Result<Vec<Resolved>> {
        let id = container.id();
        let fetched = self
            .remote()
            .list_children(id, container.object.drive_scope())
            .await?;
        tracing::debug!(path = %container.path, count = fetched.len(), "listed children from remote");

        let ids: BTreeSet<ObjectId> = fetched.iter().map(|o| o.id.clone()).collect();
        let previous = self
            .cache()
            .get_object(id)
            .filter(|r| r.absolute_path.as_deref() == Some(container.path.as_str()))
            .and_then(|r| r.children);
        for stale in previous.iter().flat_map(|p| p.difference(&ids)) {
            tracing::debug!(id = %stale, "child vanished remotely, invalidating");
            self.invalidate_subtree(stale);
        }

        let children = self.remember_listing(&container.path, fetched);

        let mut record = gdfs_cache::CachedObject::at_path(container.object.clone(), container.path.clone());
        record.children = Some(ids);
        self.cache().put_object(&record);
        self.cache().put_id_for_path(&container.path, id);
        Ok(children)
    }

    /// Cache a listing under `parent_path`. The first of several same-named
    /// siblings owns the Name Cache entry.
    fn remember_listing(&self, parent_path: &str, objects: Vec<RemoteObject>) -> Vec<Resolved> {
        let mut seen = HashSet::with_capacity(objects.len());
        objects
            .into_iter()
            .map(|object| {
                let child_path = path::join(parent_path, &object.name);
                if seen.insert(object.name.clone()) {
                    self.remember(&object, &child_path);
                } else {
                    tracing::warn!(path = %child_path, id = %object.id, "duplicate sibling name, keeping first match");
                    self.cache()
                        .put_object(&gdfs_cache::CachedObject::at_path(object.clone(), child_path.clone()));
                }
                Resolved::new(child_path, object)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use gdfs_remote::RemoteOp;

    #[tokio::test]
    async fn test_list_drives_cached() {
        let (remote, tree) = seeded_tree(TTL);
        let root = tree.root().await.unwrap();
        let drives = tree.list_children(&root).await.unwrap();
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].path, "/Team");
        tree.list_children(&root).await.unwrap();
        assert_eq!(remote.calls(RemoteOp::ListContainers), 1);
    }

    #[tokio::test]
    async fn test_children_listed_once() {
        let (remote, tree) = seeded_tree(TTL);
        let docs = tree.lookup("/Team/Docs").await.unwrap();
        remote.reset_calls();
        let first = tree.list_children(&docs).await.unwrap();
        let second = tree.list_children(&docs).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(remote.calls(RemoteOp::ListChildren), 1);
    }

    #[tokio::test]
    async fn test_empty_listing_is_remembered() {
        let (remote, tree) = seeded_tree(TTL);
        let team = tree.lookup("/Team").await.unwrap();
        let empty = remote.seed_folder(team.id(), "Empty").unwrap();
        let resolved = tree.lookup("/Team/Empty").await.unwrap();
        assert_eq!(resolved.id(), &empty.id);
        remote.reset_calls();
        assert!(tree.list_children(&resolved).await.unwrap().is_empty());
        assert!(tree.list_children(&resolved).await.unwrap().is_empty());
        assert_eq!(remote.calls(RemoteOp::ListChildren), 1);
        let record = tree.cache().get_object(&empty.id).unwrap();
        assert_eq!(record.children, Some(Default::default()));
    }

    #[tokio::test]
    async fn test_child_paths_assigned() {
        let (_remote, tree) = seeded_tree(TTL);
        let docs = tree.lookup("/Team/Docs").await.unwrap();
        let children = tree.list_children(&docs).await.unwrap();
        assert_eq!(children[0].path, "/Team/Docs/a.txt");
        let record = tree.cache().get_object(children[0].id()).unwrap();
        assert_eq!(record.absolute_path.as_deref(), Some("/Team/Docs/a.txt"));
        assert_eq!(
            tree.cache().get_id_for_path("/Team/Docs/a.txt").as_ref(),
            Some(children[0].id())
        );
    }

    #[tokio::test]
    async fn test_list_file_rejected() {
        let (_remote, tree) = seeded_tree(TTL);
        let file = tree.lookup("/Team/Docs/a.txt").await.unwrap();
        assert!(tree.list_children(&file).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_drops_vanished_children() {
        let (remote, tree) = seeded_tree(TTL);
        let docs = tree.lookup("/Team/Docs").await.unwrap();
        let file = tree.lookup("/Team/Docs/a.txt").await.unwrap();
        remote.remove_externally(file.id());
        let children = tree.refresh_children(&docs).await.unwrap();
        assert!(children.is_empty());
        assert!(tree.cache().get_object(file.id()).is_none());
        assert!(tree.cache().get_id_for_path("/Team/Docs/a.txt").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_siblings_first_wins() {
        let (remote, tree) = seeded_tree(TTL);
        let docs = tree.lookup("/Team/Docs").await.unwrap();
        let dup = remote.seed_file(docs.id(), "a.txt", b"second").unwrap();
        let children = tree.refresh_children(&docs).await.unwrap();
        assert_eq!(children.len(), 2);
        let mapped = tree.cache().get_id_for_path("/Team/Docs/a.txt").unwrap();
        assert_ne!(mapped, dup.id);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_lists() {
        let (remote, tree) = seeded_tree(None);
        let docs = tree.lookup("/Team/Docs").await.unwrap();
        remote.reset_calls();
        tree.list_children(&docs).await.unwrap();
        tree.list_children(&docs).await.unwrap();
        assert_eq!(remote.calls(RemoteOp::ListChildren), 2);
    }
}
