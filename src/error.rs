use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the ingest engine
#[derive(Error, Debug)]
pub enum IngestError {
    /// The playlist URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Asset name or episode cannot be used as a directory name
    #[error("Invalid asset identifier: {0}")]
    InvalidAsset(String),

    /// The storage directory for an asset could not be created
    #[error("Failed to create storage directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport-level failure while fetching a playlist (retryable)
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The fetched bytes are not a usable M3U8 playlist (retryable)
    #[error("Failed to parse playlist {url}: {reason}")]
    Parse { url: String, reason: String },

    /// A single segment could not be downloaded or written
    #[error("Failed to persist segment {path}: {reason}")]
    SegmentPersist { path: PathBuf, reason: String },

    /// A playlist could not be serialized or written
    #[error("Failed to persist playlist {path}: {reason}")]
    PlaylistPersist { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Whether the run loop should back off and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::Fetch { .. } | IngestError::Parse { .. })
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IngestError>;
