//! Remote object model shared by the cache, resolver and façade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved identifier of the synthetic root that lists every drive.
pub const ROOT_ID: &str = "root";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DRIVE_MIME_TYPE: &str = "application/vnd.google-apps.drive";
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Opaque identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.into())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Synthetic union of all drives.
    Root,
    /// Top-level shared drive.
    Drive,
    Folder,
    File,
}

impl ObjectKind {
    pub fn is_container(self) -> bool {
        !matches!(self, ObjectKind::File)
    }

    /// Listing type label: `dir` for containers, `file` otherwise.
    pub fn as_str(self) -> &'static str {
        if self.is_container() {
            "dir"
        } else {
            "file"
        }
    }
}

/// One remote file, folder or drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: ObjectId,
    pub name: String,
    /// At most one parent is used at a time.
    #[serde(default)]
    pub parent_ids: Vec<ObjectId>,
    pub kind: ObjectKind,
    #[serde(default)]
    pub size: u64,
    pub mime_type: String,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    /// Owning drive; `None` for drives themselves and the root.
    #[serde(default)]
    pub drive_id: Option<ObjectId>,
    #[serde(default)]
    pub trashed: bool,
}

impl RemoteObject {
    /// Synthetic root record.
    pub fn root() -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            id: ObjectId::root(),
            name: String::new(),
            parent_ids: Vec::new(),
            kind: ObjectKind::Root,
            size: 0,
            mime_type: FOLDER_MIME_TYPE.into(),
            created_time: epoch,
            modified_time: epoch,
            drive_id: None,
            trashed: false,
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    pub fn parent_id(&self) -> Option<&ObjectId> {
        self.parent_ids.first()
    }

    /// Drive that scopes listings of this container's children.
    pub fn drive_scope(&self) -> Option<&ObjectId> {
        match self.kind {
            ObjectKind::Drive => Some(&self.id),
            _ => self.drive_id.as_ref(),
        }
    }

    /// Flattened key/value view used by `get_metadata`.
    pub fn to_metadata(&self, path: &str) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("id".into(), Value::from(self.id.as_str()));
        meta.insert("name".into(), Value::from(self.name.as_str()));
        meta.insert("path".into(), Value::from(path));
        meta.insert("type".into(), Value::from(self.kind.as_str()));
        meta.insert("kind".into(), serde_json::json!(self.kind));
        meta.insert("size".into(), Value::from(self.size));
        meta.insert("mimetype".into(), Value::from(self.mime_type.as_str()));
        meta.insert("timestamp".into(), Value::from(self.modified_time.timestamp()));
        meta.insert("created_time".into(), Value::from(self.created_time.to_rfc3339()));
        meta.insert("modified_time".into(), Value::from(self.modified_time.to_rfc3339()));
        meta.insert(
            "parent_id".into(),
            self.parent_id().map(|p| Value::from(p.as_str())).unwrap_or(Value::Null),
        );
        meta.insert(
            "drive_id".into(),
            self.drive_id.as_ref().map(|d| Value::from(d.as_str())).unwrap_or(Value::Null),
        );
        meta.insert("trashed".into(), Value::from(self.trashed));
        meta
    }
}

/// Metadata for a new object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    pub mime_type: Option<String>,
}

impl NewObject {
    pub fn folder() -> Self {
        Self { mime_type: Some(FOLDER_MIME_TYPE.into()) }
    }

    /// File metadata with a mime type guessed from `name`.
    pub fn file(name: &str) -> Self {
        Self { mime_type: Some(guess_mime_type(name).into()) }
    }
}

/// Partial metadata update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectChanges {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

impl ObjectChanges {
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.mime_type.is_none() && self.modified_time.is_none()
    }
}

/// Mime type from a file extension, falling back to `application/octet-stream`.
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MIME_TYPE,
    };
    match ext.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => DEFAULT_MIME_TYPE,
    }
}
