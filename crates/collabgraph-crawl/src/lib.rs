//! # Collabgraph Crawl
//!
//! Breadth-first discovery of collaborators, steered live by a client.
//!
//! ## Overview
//!
//! - [`GithubApi`]: typed access to the upstream endpoints, through the
//!   response cache
//! - [`Expander`]: records a user's collaborators in the shared graph
//! - [`CrawlSession`]: one client's crawl, replaying stored expansions and then
//!   growing live under pause and depth control
//! - [`protocol`]: messages exchanged with the client
//!
//! ## Example
//!
//! ```rust,no_run
//! use collabgraph_cache::ResponseCache;
//! use collabgraph_crawl::{
//!     CrawlSession, GithubApi, GithubExpander, SessionOptions, UserProfile,
//! };
//! use collabgraph_storage::CollaboratorGraph;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ResponseCache::with_defaults()?);
//! let graph = Arc::new(CollaboratorGraph::new());
//! let api = GithubApi::new(cache, "https://api.github.com");
//! let expander = Arc::new(GithubExpander::new(api, graph.clone()));
//!
//! let (outbox, _messages) = tokio::sync::mpsc::unbounded_channel();
//! let session = CrawlSession::new(
//!     UserProfile::new("octocat"),
//!     "token",
//!     graph,
//!     expander,
//!     outbox,
//!     SessionOptions::default(),
//! );
//! session.run(futures::stream::empty(), CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod expand;
pub mod protocol;
pub mod session;
pub mod target;

pub use api::{Contributor, GithubApi, Repository, UserProfile, DEFAULT_API_BASE_URL};
pub use error::{CommandError, CrawlError, Result};
pub use expand::{Expander, GithubExpander};
pub use protocol::{ClientCommand, Command, ServerMessage, Status};
pub use session::{CrawlSession, Outbox, SessionOptions};
pub use target::{path_to, TargetWatch};
