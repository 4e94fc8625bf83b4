use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Traversal backend failed on {path}: {source}")]
    Backend {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TraversalError {
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            TraversalError::PermissionDenied(path)
        } else {
            TraversalError::Backend { path, source }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageInfoError {
    #[error("Image path has no parent directory: {0}")]
    MissingSubject(String),

    #[error("Image name has no repetition suffix: {0}")]
    MissingRepetition(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("No images to save")]
    NoImages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid image path: {0}")]
    ImageInfo(#[from] ImageInfoError),
}
