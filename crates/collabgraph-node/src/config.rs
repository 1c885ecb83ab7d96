//! Node configuration types.

use anyhow::{bail, Context};
use collabgraph_cache::CacheConfig;
use collabgraph_crawl::{SessionOptions, DEFAULT_API_BASE_URL};
use collabgraph_storage::DEFAULT_REQUESTED_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the node, loaded from an optional YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Upstream API base URL.
    pub api_base_url: String,
    /// How long a cached response is served without revalidation.
    pub cache_ttl_secs: u64,
    /// Seconds between snapshot saves.
    pub autosave_interval_secs: u64,
    /// Requested depth for a root user seen for the first time.
    pub initial_requested_depth: i64,
    /// Whether new sessions wait for a `continue` command.
    pub start_paused: bool,
    /// Username to report a discovery path for.
    pub target: Option<String>,
    /// User-Agent sent upstream.
    pub user_agent: String,
    /// Per-request upstream timeout. Zero, the default, disables it.
    pub request_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_ttl_secs: 24 * 60 * 60,
            autosave_interval_secs: 30,
            initial_requested_depth: DEFAULT_REQUESTED_DEPTH,
            start_paused: true,
            target: None,
            user_agent: concat!("collabgraph/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl NodeConfig {
    /// Parses a YAML document. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("failed to load {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.autosave_interval_secs == 0 {
            bail!("autosave_interval_secs must be positive");
        }
        if self.api_base_url.is_empty() {
            bail!("api_base_url must not be empty");
        }
        Ok(())
    }

    /// Response cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            user_agent: self.user_agent.clone(),
            timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }

    /// Settings applied to every new crawl session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            start_paused: self.start_paused,
            initial_requested_depth: self.initial_requested_depth,
            target: self.target.clone(),
        }
    }

    /// Interval between snapshot saves.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}

/// OAuth application registration.
///
/// The login exchange itself is handled outside this service; the node only
/// refuses to start without a complete registration. The secret is checked,
/// never kept.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    /// Client identifier.
    pub client_id: String,
}

impl OAuthApp {
    /// Creates a registration, rejecting empty values.
    pub fn new(client_id: impl Into<String>, client_secret: impl AsRef<str>) -> anyhow::Result<Self> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            bail!("OAuth client id is empty");
        }
        if client_secret.as_ref().trim().is_empty() {
            bail!("OAuth client secret is empty");
        }
        Ok(Self { client_id })
    }
}
