//! Cached responses and cache entries.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// HTTP status returned by upstream when a conditional request matched.
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// An HTTP response as stored in, and returned from, the cache.
///
/// Header names are stored lowercased. Every value handed to a caller is an
/// owned copy, so mutating it never affects the cached entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Header multimap (lowercase name -> values in arrival order).
    pub headers: BTreeMap<String, Vec<String>>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header value, keeping any existing values for the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    /// Reads a full response off the wire.
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status().as_u16();

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            // Non-UTF-8 header values are of no use to the crawler.
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Returns the first value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the entity tag validator, if the response carried one.
    pub fn etag(&self) -> Option<String> {
        self.header("etag")
            .filter(|etag| !etag.is_empty())
            .map(str::to_string)
    }

    /// Returns true for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Returns true if upstream answered a conditional request with 304.
    pub fn is_not_modified(&self) -> bool {
        self.status == STATUS_NOT_MODIFIED
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// One cached exchange for a `(credential, method, url)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the response was fetched or last revalidated.
    pub fetched_at: DateTime<Utc>,
    /// Validator sent back upstream on revalidation.
    pub etag: Option<String>,
    /// The stored response.
    pub response: CachedResponse,
}

impl CacheEntry {
    /// Creates a new entry.
    pub fn new(fetched_at: DateTime<Utc>, etag: Option<String>, response: CachedResponse) -> Self {
        Self {
            fetched_at,
            etag,
            response,
        }
    }

    /// Age of the entry at `now`. Timestamps in the future count as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or_default()
    }

    /// Returns true while the entry may be served without contacting upstream.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}
