//! In-memory Remote Object Service.
//!
//! Behaves like the drive API where it matters to the cache: IDs are opaque
//! UUIDs, sibling names may collide, trashed items vanish from listings but
//! stay fetchable by ID, and folders cannot be copied. Every trait call is
//! counted so callers can assert on remote traffic.

use crate::traits::{ByteStream, RemoteObjectService};
use async_trait::async_trait;
use chrono::Utc;
use gdfs_core::error::{GdfsError, Result};
use gdfs_core::types::{
    NewObject, ObjectChanges, ObjectId, ObjectKind, RemoteObject, DEFAULT_MIME_TYPE,
    DRIVE_MIME_TYPE, FOLDER_MIME_TYPE,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    GetById,
    ListContainers,
    ListChildren,
    Create,
    UpdateMetadata,
    Reparent,
    Copy,
    Delete,
    OpenReadStream,
    Upload,
}

#[derive(Default)]
struct State {
    objects: HashMap<ObjectId, RemoteObject>,
    contents: HashMap<ObjectId, Vec<u8>>,
    /// Creation order, so listings are deterministic.
    order: Vec<ObjectId>,
}

impl State {
    fn insert(&mut self, object: RemoteObject, content: Option<Vec<u8>>) {
        if let Some(content) = content {
            self.contents.insert(object.id.clone(), content);
        }
        self.order.push(object.id.clone());
        self.objects.insert(object.id.clone(), object);
    }

    fn get(&self, id: &ObjectId) -> Result<&RemoteObject> {
        self.objects
            .get(id)
            .ok_or_else(|| GdfsError::ObjectNotFound { id: id.to_string() })
    }

    /// Live container that can accept children.
    fn container(&self, id: &ObjectId) -> Result<&RemoteObject> {
        let obj = self.get(id)?;
        if obj.trashed {
            return Err(GdfsError::ObjectNotFound { id: id.to_string() });
        }
        if !obj.is_container() {
            return Err(GdfsError::InvalidArgument(format!("not a container: {id}")));
        }
        Ok(obj)
    }

    fn children_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.order
            .iter()
            .filter(|c| {
                self.objects
                    .get(*c)
                    .is_some_and(|o| o.parent_ids.contains(id))
            })
            .cloned()
            .collect()
    }

    /// `id` followed by every descendant, depth first.
    fn subtree(&self, id: &ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            stack.extend(self.children_of(&next));
            out.push(next);
        }
        out
    }

    fn remove(&mut self, ids: &[ObjectId]) {
        for id in ids {
            self.objects.remove(id);
            self.contents.remove(id);
        }
        self.order.retain(|o| !ids.contains(o));
    }
}

pub struct MemoryRemote {
    state: RwLock<State>,
    calls: Mutex<HashMap<RemoteOp, usize>>,
    /// Remaining successful calls before an op starts failing.
    faults: Mutex<HashMap<RemoteOp, usize>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            calls: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    // ========== Seeding (not counted) ==========

    /// Add a top-level drive.
    pub fn add_drive(&self, name: &str) -> RemoteObject {
        let now = Utc::now();
        let drive = RemoteObject {
            id: new_id(),
            name: name.into(),
            parent_ids: Vec::new(),
            kind: ObjectKind::Drive,
            size: 0,
            mime_type: DRIVE_MIME_TYPE.into(),
            created_time: now,
            modified_time: now,
            drive_id: None,
            trashed: false,
        };
        self.state.write().insert(drive.clone(), None);
        drive
    }

    pub fn seed_folder(&self, parent: &ObjectId, name: &str) -> Result<RemoteObject> {
        let mut state = self.state.write();
        let folder = new_object(state.container(parent)?, name, true, &NewObject::folder());
        state.insert(folder.clone(), None);
        Ok(folder)
    }

    pub fn seed_file(&self, parent: &ObjectId, name: &str, content: &[u8]) -> Result<RemoteObject> {
        let mut state = self.state.write();
        let mut file = new_object(state.container(parent)?, name, false, &NewObject::file(name));
        file.size = content.len() as u64;
        state.insert(file.clone(), Some(content.to_vec()));
        Ok(file)
    }

    /// Permanently remove an object and its subtree without counting a call.
    /// Simulates changes made by another client.
    pub fn remove_externally(&self, id: &ObjectId) {
        let mut state = self.state.write();
        let ids = state.subtree(id);
        state.remove(&ids);
    }

    // ========== Inspection ==========

    pub fn object(&self, id: &ObjectId) -> Option<RemoteObject> {
        self.state.read().objects.get(id).cloned()
    }

    pub fn content(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.state.read().contents.get(id).cloned()
    }

    /// Every live drive, without counting a call.
    pub fn drives(&self) -> Vec<RemoteObject> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|o| o.kind == ObjectKind::Drive && !o.trashed)
            .cloned()
            .collect()
    }

    /// Untrashed children named `name` under `parent`.
    pub fn children_named(&self, parent: &ObjectId, name: &str) -> Vec<RemoteObject> {
        let state = self.state.read();
        state
            .children_of(parent)
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|o| !o.trashed && o.name == name)
            .cloned()
            .collect()
    }

    pub fn calls(&self, op: RemoteOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    // ========== Fault injection ==========

    /// Let `op` succeed `n` more times, then fail with `RemoteUnavailable`.
    pub fn fail_after(&self, op: RemoteOp, n: usize) {
        self.faults.lock().insert(op, n);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    fn record(&self, op: RemoteOp) -> Result<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let mut faults = self.faults.lock();
        match faults.get_mut(&op) {
            Some(0) => Err(GdfsError::RemoteUnavailable(format!("injected failure: {op:?}"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> ObjectId {
    ObjectId::new(uuid::Uuid::new_v4().simple().to_string())
}

fn new_object(parent: &RemoteObject, name: &str, is_container: bool, metadata: &NewObject) -> RemoteObject {
    let now = Utc::now();
    let (kind, default_mime) = if is_container {
        (ObjectKind::Folder, FOLDER_MIME_TYPE)
    } else {
        (ObjectKind::File, DEFAULT_MIME_TYPE)
    };
    RemoteObject {
        id: new_id(),
        name: name.into(),
        parent_ids: vec![parent.id.clone()],
        kind,
        size: 0,
        mime_type: metadata.mime_type.clone().unwrap_or_else(|| default_mime.into()),
        created_time: now,
        modified_time: now,
        drive_id: parent.drive_scope().cloned(),
        trashed: false,
    }
}

fn apply_changes(obj: &mut RemoteObject, changes: &ObjectChanges) {
    if let Some(name) = &changes.name {
        obj.name = name.clone();
    }
    if let Some(mime) = &changes.mime_type {
        obj.mime_type = mime.clone();
    }
    obj.modified_time = changes.modified_time.unwrap_or_else(Utc::now);
}

#[async_trait]
impl RemoteObjectService for MemoryRemote {
    async fn get_by_id(&self, id: &ObjectId) -> Result<RemoteObject> {
        self.record(RemoteOp::GetById)?;
        self.state.read().get(id).cloned()
    }

    async fn list_containers(&self) -> Result<Vec<RemoteObject>> {
        self.record(RemoteOp::ListContainers)?;
        Ok(self.drives())
    }

    async fn list_children(
        &self,
        container_id: &ObjectId,
        drive_scope: Option<&ObjectId>,
    ) -> Result<Vec<RemoteObject>> {
        self.record(RemoteOp::ListChildren)?;
        let state = self.state.read();
        state.container(container_id)?;
        Ok(state
            .children_of(container_id)
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|o| !o.trashed)
            .filter(|o| drive_scope.map_or(true, |d| o.drive_id.as_ref() == Some(d)))
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        parent_id: &ObjectId,
        name: &str,
        is_container: bool,
        metadata: &NewObject,
    ) -> Result<RemoteObject> {
        self.record(RemoteOp::Create)?;
        if name.is_empty() || name.contains('/') {
            return Err(GdfsError::InvalidArgument(format!("invalid name: {name:?}")));
        }
        let mut state = self.state.write();
        let obj = new_object(state.container(parent_id)?, name, is_container, metadata);
        let content = (!is_container).then(Vec::new);
        state.insert(obj.clone(), content);
        Ok(obj)
    }

    async fn update_metadata(&self, id: &ObjectId, changes: &ObjectChanges) -> Result<RemoteObject> {
        self.record(RemoteOp::UpdateMetadata)?;
        let mut state = self.state.write();
        let obj = state
            .objects
            .get_mut(id)
            .ok_or_else(|| GdfsError::ObjectNotFound { id: id.to_string() })?;
        apply_changes(obj, changes);
        Ok(obj.clone())
    }

    async fn reparent(
        &self,
        id: &ObjectId,
        old_parent_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> Result<RemoteObject> {
        self.record(RemoteOp::Reparent)?;
        let mut state = self.state.write();
        let new_scope = state.container(new_parent_id)?.drive_scope().cloned();
        if !state.get(id)?.parent_ids.contains(old_parent_id) {
            return Err(GdfsError::ConflictingState(format!(
                "{old_parent_id} is not a parent of {id}"
            )));
        }
        if state.subtree(id).contains(new_parent_id) {
            return Err(GdfsError::InvalidArgument(format!(
                "cannot move {id} below itself"
            )));
        }
        for member in state.subtree(id) {
            if let Some(o) = state.objects.get_mut(&member) {
                o.drive_id = new_scope.clone();
            }
        }
        let obj = state
            .objects
            .get_mut(id)
            .ok_or_else(|| GdfsError::ObjectNotFound { id: id.to_string() })?;
        obj.parent_ids = vec![new_parent_id.clone()];
        obj.modified_time = Utc::now();
        Ok(obj.clone())
    }

    async fn copy(
        &self,
        src_id: &ObjectId,
        dest_parent_id: &ObjectId,
        new_name: &str,
        overrides: &ObjectChanges,
    ) -> Result<RemoteObject> {
        self.record(RemoteOp::Copy)?;
        let mut state = self.state.write();
        let src = state.get(src_id)?.clone();
        if src.is_container() {
            return Err(GdfsError::InvalidArgument(format!("cannot copy container {src_id}")));
        }
        let parent = state.container(dest_parent_id)?;
        let mut copy = new_object(parent, new_name, false, &NewObject { mime_type: Some(src.mime_type.clone()) });
        copy.size = src.size;
        apply_changes(&mut copy, overrides);
        let content = state.contents.get(src_id).cloned().unwrap_or_default();
        state.insert(copy.clone(), Some(content));
        Ok(copy)
    }

    async fn delete(&self, id: &ObjectId, permanent: bool) -> Result<()> {
        self.record(RemoteOp::Delete)?;
        let mut state = self.state.write();
        state.get(id)?;
        if permanent {
            let ids = state.subtree(id);
            state.remove(&ids);
        } else if let Some(o) = state.objects.get_mut(id) {
            o.trashed = true;
        }
        Ok(())
    }

    async fn open_read_stream(&self, id: &ObjectId) -> Result<ByteStream> {
        self.record(RemoteOp::OpenReadStream)?;
        let state = self.state.read();
        let obj = state.get(id)?;
        if obj.is_container() {
            return Err(GdfsError::InvalidArgument(format!("cannot read container {id}")));
        }
        let bytes = state.contents.get(id).cloned().unwrap_or_default();
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    async fn upload(&self, id: &ObjectId, mut body: ByteStream, size: u64) -> Result<RemoteObject> {
        self.record(RemoteOp::Upload)?;
        {
            let state = self.state.read();
            if state.get(id)?.is_container() {
                return Err(GdfsError::InvalidArgument(format!("cannot upload to container {id}")));
            }
        }
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)
            .await
            .map_err(|e| GdfsError::InvalidArgument(format!("upload body for {id}: {e}")))?;
        if buf.len() as u64 != size {
            return Err(GdfsError::InvalidArgument(format!(
                "upload size mismatch for {id}: declared {size}, got {}",
                buf.len()
            )));
        }
        let mut state = self.state.write();
        let obj = state
            .objects
            .get_mut(id)
            .ok_or_else(|| GdfsError::ObjectNotFound { id: id.to_string() })?;
        obj.size = size;
        obj.modified_time = Utc::now();
        let updated = obj.clone();
        state.contents.insert(id.clone(), buf);
        tracing::debug!(id = %id, size, "upload stored");
        Ok(updated)
    }
}
