use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Index error: {0}")]
    Index(#[from] tindex_core::IndexError),

    #[error("failed to read manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: Box<SyncError>,
    },

    #[error("walking {path:?} failed: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("template event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SyncError>;
