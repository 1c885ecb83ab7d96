//! Storage error types.

use thiserror::Error;

/// Errors that can occur while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
