//! # Collabgraph Node
//!
//! HTTP and WebSocket front end for live collaborator graph exploration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Collabgraph Node                   │
//! ├──────────────────────────────────────────────────────┤
//! │  HTTP layer       /ws (crawl sessions), /health      │
//! │        │                                             │
//! │  Crawl layer      one session per connection,        │
//! │                   shared collaborator graph          │
//! │        │                                             │
//! │  Upstream layer   response cache with revalidation   │
//! │        │                                             │
//! │  Storage layer    gzip snapshot, autosaved           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Shared state, router and health check
//! - [`realtime_api`] - WebSocket crawl endpoint
//! - [`config`] - Node configuration
//! - [`persistence`] - Snapshot autosave
//! - [`observability`] - Structured logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use collabgraph_node::api::{create_router, AppState};
//! use collabgraph_node::config::NodeConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = AppState::new(NodeConfig::default())?;
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod observability;
pub mod persistence;
pub mod realtime_api;
