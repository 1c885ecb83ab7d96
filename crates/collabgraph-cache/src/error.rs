//! Error types for the response cache.

use thiserror::Error;

/// Errors that can occur while fetching through the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The HTTP method could not be parsed.
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// The request URL could not be parsed.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The URL as given by the caller.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A specialized Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
