//! Revalidating response cache.
//!
//! Every upstream call made by the crawler goes through [`ResponseCache::fetch`].
//! Entries are keyed by `credential:method:url` and follow one policy:
//!
//! 1. No entry: send the request. Store the response only if it carries an
//!    `ETag`.
//! 2. Entry no older than the TTL: return it without contacting upstream.
//! 3. Stale entry: send the request with `If-None-Match`. A `304` keeps the
//!    stored body and resets `fetched_at`; anything else replaces the entry.
//!
//! Fetches for the same key are serialized by a per-key async lock held across
//! the network call, so two callers never race on one entry. Distinct keys do
//! not block each other. A key's lock is dropped once no fetch holds or awaits
//! it.

use crate::entry::{CacheEntry, CachedResponse};
use crate::error::{CacheError, Result};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{AUTHORIZATION, IF_NONE_MATCH};
use reqwest::{Client, Method, Url};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default freshness window for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Header upstream uses to report the remaining request budget.
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry is served without revalidation.
    pub ttl: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            user_agent: concat!("collabgraph/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Responses served without contacting upstream.
    pub hits: u64,
    /// Requests for keys with no entry.
    pub misses: u64,
    /// Stale entries confirmed unchanged by upstream.
    pub revalidated: u64,
    /// Current number of entries.
    pub size: usize,
}

#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    revalidated: AtomicU64,
}

/// Builds the composite key for one request.
pub fn cache_key(credential: &str, method: &Method, url: &str) -> String {
    format!("{credential}:{method}:{url}")
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Thread-safe HTTP response cache with TTL and conditional revalidation.
#[derive(Debug)]
pub struct ResponseCache {
    client: Client,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    key_locks: Mutex<HashMap<String, KeyLock>>,
    metrics: CacheMetrics,
}

impl ResponseCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            ttl: config.ttl,
            entries: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        })
    }

    /// Creates an empty cache with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(CacheConfig::default())
    }

    /// Fetches `url` with `method`, using `credential` as a bearer token when
    /// non-empty.
    ///
    /// Transport failures are returned to the caller and leave the entry for
    /// this key untouched.
    pub async fn fetch(&self, credential: &str, method: &str, url: &str) -> Result<CachedResponse> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| CacheError::InvalidMethod(method.to_string()))?;
        let url = Url::parse(url).map_err(|e| CacheError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let key = cache_key(credential, &method, url.as_str());

        let key_lock = self.key_lock(&key);
        let result = {
            let _guard = key_lock.lock().await;
            self.fetch_locked(credential, method, url, key.clone()).await
        };
        self.release_key_lock(&key, key_lock);
        result
    }

    /// Applies the cache policy. The caller holds the lock for `key`.
    async fn fetch_locked(
        &self,
        credential: &str,
        method: Method,
        url: Url,
        key: String,
    ) -> Result<CachedResponse> {
        let existing = self.entries.read().get(&key).cloned();
        match existing {
            Some(entry) if entry.is_fresh(Utc::now(), self.ttl) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%method, %url, "Using cached response");
                Ok(entry.response)
            }
            Some(entry) => self.revalidate(credential, method, url, key, entry).await,
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                let response = self.send(credential, method, url, None).await?;
                if let Some(etag) = response.etag() {
                    debug!(key = %key, "Response cached");
                    self.entries
                        .write()
                        .insert(key, CacheEntry::new(Utc::now(), Some(etag), response.clone()));
                }
                Ok(response)
            }
        }
    }

    async fn revalidate(
        &self,
        credential: &str,
        method: Method,
        url: Url,
        key: String,
        entry: CacheEntry,
    ) -> Result<CachedResponse> {
        let response = self
            .send(credential, method, url, entry.etag.as_deref())
            .await?;

        if response.is_not_modified() {
            self.metrics.revalidated.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cached response revalidated");
            let refreshed = CacheEntry {
                fetched_at: Utc::now(),
                ..entry
            };
            let stored = refreshed.response.clone();
            self.entries.write().insert(key, refreshed);
            return Ok(stored);
        }

        debug!(key = %key, status = response.status, "Cached response replaced");
        self.entries.write().insert(
            key,
            CacheEntry::new(Utc::now(), response.etag(), response.clone()),
        );
        Ok(response)
    }

    async fn send(
        &self,
        credential: &str,
        method: Method,
        url: Url,
        etag: Option<&str>,
    ) -> Result<CachedResponse> {
        info!(%method, %url, "Sending request");

        let mut request = self.client.request(method, url);
        if !credential.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {credential}"));
        }
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = CachedResponse::read(request.send().await?).await?;
        if let Some(remaining) = response.header(RATE_LIMIT_REMAINING) {
            debug!(remaining, "Upstream rate limit");
        }
        Ok(response)
    }

    fn key_lock(&self, key: &str) -> KeyLock {
        self.key_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Forgets the lock for `key` unless another fetch still holds a handle.
    fn release_key_lock(&self, key: &str, key_lock: KeyLock) {
        let mut locks = self.key_locks.lock();
        // One handle in the map, one here.
        if Arc::strong_count(&key_lock) == 2 {
            locks.remove(key);
        }
    }

    /// Returns a copy of the entry stored under `key`.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Returns a copy of every entry, for snapshotting.
    pub fn entries(&self) -> HashMap<String, CacheEntry> {
        self.entries.read().clone()
    }

    /// Replaces the cache contents, typically with a loaded snapshot.
    pub fn restore(&self, entries: HashMap<String, CacheEntry>) {
        *self.entries.write() = entries;
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            revalidated: self.metrics.revalidated.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_components() {
        let key = cache_key("tok", &Method::GET, "https://api.github.com/user");
        assert_eq!(key, "tok:GET:https://api.github.com/user");
        assert_ne!(key, cache_key("", &Method::GET, "https://api.github.com/user"));
        assert_ne!(key, cache_key("tok", &Method::POST, "https://api.github.com/user"));
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let cache = ResponseCache::with_defaults().unwrap();
        let result = cache.fetch("", "GE T", "https://example.com/").await;
        assert!(matches!(result, Err(CacheError::InvalidMethod(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let cache = ResponseCache::with_defaults().unwrap();
        let result = cache.fetch("", "GET", "000").await;
        assert!(matches!(result, Err(CacheError::InvalidUrl { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_restore_replaces_entries() {
        let cache = ResponseCache::with_defaults().unwrap();
        let mut entries = HashMap::new();
        entries.insert(
            "k".to_string(),
            CacheEntry::new(Utc::now(), Some("xyz".into()), CachedResponse::new(200, "abc")),
        );
        cache.restore(entries);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entry("k").unwrap().etag.as_deref(), Some("xyz"));

        cache.restore(HashMap::new());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_key_locks_released_after_fetch() {
        use wiremock::matchers::method as http_method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("etag", "v1")
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;

        let cache = ResponseCache::with_defaults().unwrap();
        let first = format!("{}/a", server.uri());
        let second = format!("{}/b", server.uri());

        let (a1, a2, b) = tokio::join!(
            cache.fetch("tok", "GET", &first),
            cache.fetch("tok", "GET", &first),
            cache.fetch("tok", "GET", &second),
        );
        assert!(a1.is_ok() && a2.is_ok() && b.is_ok());
        assert_eq!(cache.len(), 2);
        assert!(cache.key_locks.lock().is_empty());

        // Failed fetches release their lock too.
        assert!(cache.fetch("tok", "GET", "http://127.0.0.1:1/").await.is_err());
        assert!(cache.key_locks.lock().is_empty());
    }

    #[test]
    fn test_stats_start_empty() {
        let cache = ResponseCache::with_defaults().unwrap();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
