//! Top-down path resolution.
//!
//! A full-path Name Cache hit returns immediately. Otherwise the path is
//! walked segment by segment from `/`, so remote listings are bounded by the
//! number of uncached directory levels.

use crate::tree::{DriveTree, Resolved};
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::path;
use gdfs_core::types::ObjectId;

/// Outcome of walking a path as far as it exists.
#[derive(Debug, Clone)]
pub struct Walk {
    /// Deepest existing object on the path.
    pub deepest: Resolved,
    /// Segments below `deepest` that do not exist, in order.
    pub missing: Vec<String>,
}

impl Walk {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl DriveTree {
    pub async fn resolve(&self, path: &str) -> Result<ObjectId> {
        Ok(self.lookup(path).await?.object.id)
    }

    /// Resolve `path` to its object; `NotFound` if any segment is missing.
    pub async fn lookup(&self, path: &str) -> Result<Resolved> {
        let path = path::normalize(path)?;
        if path::is_root(&path) {
            return self.root().await;
        }
        if let Some(record) = self.cached_at(&path) {
            tracing::debug!(path = %path, id = %record.object.id, "name cache hit");
            return Ok(Resolved::new(path, record.object));
        }
        let walk = self.walk(&path).await?;
        if walk.is_complete() {
            Ok(walk.deepest)
        } else {
            Err(GdfsError::not_found(path))
        }
    }

    /// Walk a normalised path from `/` until a segment is missing or a file
    /// is reached with segments left over.
    pub async fn walk(&self, path: &str) -> Result<Walk> {
        let segments = path::segments(path);
        let mut current = self.root().await?;
        for (i, name) in segments.iter().enumerate() {
            let next = if current.object.is_container() {
                self.find_child(&current, name).await?
            } else {
                None
            };
            match next {
                Some(child) => current = child,
                None => {
                    return Ok(Walk {
                        deepest: current,
                        missing: segments[i..].iter().map(|s| s.to_string()).collect(),
                    })
                }
            }
        }
        Ok(Walk { deepest: current, missing: Vec::new() })
    }

    async fn find_child(&self, parent: &Resolved, name: &str) -> Result<Option<Resolved>> {
        let child_path = path::join(&parent.path, name);
        if let Some(record) = self.cached_at(&child_path) {
            return Ok(Some(Resolved::new(child_path, record.object)));
        }
        Ok(self
            .list_children(parent)
            .await?
            .into_iter()
            .find(|c| c.object.name == name))
    }
}
