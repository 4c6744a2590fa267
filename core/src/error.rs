//! Error taxonomy shared by collection, loading, search and dispatch.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The upstream metadata source could not be reached after retrying.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A dataset file could not be parsed into valid records.
    #[error("corrupt dataset {path}: {message}")]
    CorruptDataset { path: String, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    /// Collection finished without a single usable record.
    #[error("collection for {query:?} over {days} day(s) produced no records")]
    EmptyResult { query: String, days: u32 },

    #[error("an ingestion run is already in progress ({0})")]
    AlreadyRunning(String),

    #[error("ingestion cancelled")]
    Cancelled,

    /// The index offered to the store was built from another snapshot.
    #[error("index built for snapshot {index} cannot be paired with snapshot {snapshot}")]
    IndexMismatch { snapshot: String, index: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(path: impl AsRef<std::path::Path>, message: impl fmt::Display) -> Self {
        Self::CorruptDataset {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether repeating the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::AlreadyRunning(_) | Self::Io(_))
    }
}
