use async_trait::async_trait;
use gdfs_core::error::Result;
use gdfs_core::types::{NewObject, ObjectChanges, ObjectId, RemoteObject};
use tokio::io::AsyncRead;

/// Byte stream used for downloads and uploads.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Authenticated CRUD against the remote object store.
///
/// Implementations own transport, auth and retry policy. A missing ID is
/// reported as `GdfsError::ObjectNotFound`; transport failures as
/// `GdfsError::RemoteUnavailable`.
#[async_trait]
pub trait RemoteObjectService: Send + Sync {
    async fn get_by_id(&self, id: &ObjectId) -> Result<RemoteObject>;

    /// Top-level drives visible to the caller.
    async fn list_containers(&self) -> Result<Vec<RemoteObject>>;

    /// Untrashed items whose parent is `container_id`, scoped to `drive_scope`.
    async fn list_children(
        &self,
        container_id: &ObjectId,
        drive_scope: Option<&ObjectId>,
    ) -> Result<Vec<RemoteObject>>;

    async fn create(
        &self,
        parent_id: &ObjectId,
        name: &str,
        is_container: bool,
        metadata: &NewObject,
    ) -> Result<RemoteObject>;

    async fn update_metadata(&self, id: &ObjectId, changes: &ObjectChanges) -> Result<RemoteObject>;

    async fn reparent(
        &self,
        id: &ObjectId,
        old_parent_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> Result<RemoteObject>;

    async fn copy(
        &self,
        src_id: &ObjectId,
        dest_parent_id: &ObjectId,
        new_name: &str,
        overrides: &ObjectChanges,
    ) -> Result<RemoteObject>;

    /// Trash (`permanent == false`) or permanently delete an object.
    async fn delete(&self, id: &ObjectId, permanent: bool) -> Result<()>;

    async fn open_read_stream(&self, id: &ObjectId) -> Result<ByteStream>;

    /// Replace the content of an existing file with `size` bytes from `body`.
    async fn upload(&self, id: &ObjectId, body: ByteStream, size: u64) -> Result<RemoteObject>;
}
