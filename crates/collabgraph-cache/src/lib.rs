//! # Collabgraph Cache
//!
//! Revalidating HTTP response cache used for every upstream API call.
//!
//! Responses are cached per `(credential, method, url)` and served without a
//! network round trip for [`DEFAULT_TTL`]. Older entries are revalidated with
//! `If-None-Match`; a `304 Not Modified` keeps the stored body and restarts the
//! freshness window.
//!
//! ## Example
//!
//! ```rust,no_run
//! use collabgraph_cache::ResponseCache;
//!
//! # async fn run() -> collabgraph_cache::Result<()> {
//! let cache = ResponseCache::with_defaults()?;
//! let response = cache
//!     .fetch("gho_token", "GET", "https://api.github.com/user")
//!     .await?;
//! if !response.is_error() {
//!     let user: serde_json::Value = response.json().expect("valid JSON");
//!     println!("{}", user["login"]);
//! }
//! # Ok(())
//! # }
//! ```

mod cache;
mod entry;
mod error;

pub use cache::{cache_key, CacheConfig, CacheStats, ResponseCache, DEFAULT_TTL};
pub use entry::{CacheEntry, CachedResponse, STATUS_NOT_MODIFIED};
pub use error::{CacheError, Result};
