use thiserror::Error;

#[derive(Error, Debug)]
pub enum GdfsError {
    #[error("Path not found: {path}")]
    NotFound { path: String },
    #[error("Object not found: {id}")]
    ObjectNotFound { id: String },
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Conflicting state: {0}")]
    ConflictingState(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GdfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// True for both path and object-id misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ObjectNotFound { .. })
    }

    /// Rewrites an object-id miss into a path miss for `path`.
    pub fn at_path(self, path: &str) -> Self {
        match self {
            Self::ObjectNotFound { .. } => Self::not_found(path),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, GdfsError>;
