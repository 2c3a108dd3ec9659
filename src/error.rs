//! Error types for the documentation search core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a book, indexing it or opening the indexes.
///
/// Query paths (suggest/search) never return these to the caller: they log
/// and degrade to empty results instead.
#[derive(Debug, Error)]
pub enum DocsError {
    /// A book descriptor or page file does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// The book descriptor is not a JSON file
    #[error("Unsupported book format: {0}")]
    UnsupportedFormat(String),
    /// The book descriptor could not be turned into a book
    #[error("Corrupt book data: {0}")]
    CorruptData(String),
    /// The index could not be opened, written or queried
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DocsError {
    fn from(e: rusqlite::Error) -> Self {
        DocsError::IndexUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocsError>;
