//! HTTP API: shared state, router and health endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use collabgraph_cache::ResponseCache;
use collabgraph_crawl::{Expander, GithubApi, GithubExpander};
use collabgraph_storage::{CollaboratorGraph, Snapshot};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::NodeConfig;
use crate::realtime_api::realtime_routes;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Revalidating cache in front of the upstream API.
    pub cache: Arc<ResponseCache>,
    /// Process-wide collaborator graph.
    pub graph: Arc<CollaboratorGraph>,
    /// Typed upstream client.
    pub api: GithubApi,
    /// Expansion strategy used by crawl sessions.
    pub expander: Arc<dyn Expander>,
    /// Node configuration.
    pub config: Arc<NodeConfig>,
    /// Fired when the node shuts down.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the state from configuration, with empty cache and graph.
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let cache = Arc::new(ResponseCache::new(config.cache_config())?);
        let graph = Arc::new(CollaboratorGraph::new());
        let api = GithubApi::new(cache.clone(), config.api_base_url.clone());
        let expander: Arc<dyn Expander> =
            Arc::new(GithubExpander::new(api.clone(), graph.clone()));

        Ok(Self {
            cache,
            graph,
            api,
            expander,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        })
    }

    /// Seeds the cache and graph from a loaded snapshot.
    pub fn restore(&self, snapshot: Snapshot) {
        self.cache.restore(snapshot.requests);
        self.graph.restore(snapshot.collab_graph);
    }

    /// Captures the cache and graph for persistence.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.cache.entries(), self.graph.entries())
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing credential")]
    MissingCredential,
    #[error("credential rejected upstream")]
    Unauthorized,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingCredential | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cached_requests: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub users: usize,
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(realtime_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.cache.stats();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cached_requests: stats.size,
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        users: state.graph.len(),
    })
}
