//! Error types for crawling.

use thiserror::Error;

/// Errors that can occur while querying upstream.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The request failed before a response was received.
    #[error("request failed: {0}")]
    Cache(#[from] collabgraph_cache::CacheError),

    /// Upstream answered with an error status.
    #[error("{url} returned {status}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The response body was not the expected JSON.
    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reading commands from the live client channel.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The message was not a valid command object.
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The client sent a frame type the protocol does not use.
    #[error("unsupported frame: {0}")]
    UnsupportedFrame(&'static str),

    /// The client closed the connection.
    #[error("connection closed by client")]
    Closed,

    /// The underlying connection failed.
    #[error("connection error: {0}")]
    Connection(String),
}

/// A specialized Result type for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
