pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use config::DriveFsConfig;
pub use error::{GdfsError, Result};
pub use types::{NewObject, ObjectChanges, ObjectId, ObjectKind, RemoteObject};
