use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("invalid label: {0}")]
    UnknownLedger(String),

    #[error("unable to read name map {path:?}: {source}")]
    NameMap {
        path: PathBuf,
        #[source]
        source: Box<IndexError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
