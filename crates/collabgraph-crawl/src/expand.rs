//! Graph expansion.
//!
//! Expanding a user means listing their repositories, listing the
//! contributors of each, and recording the union as the user's collaborators.
//! Which repository linked two users is not kept.

use crate::api::{GithubApi, UserProfile};
use async_trait::async_trait;
use collabgraph_storage::CollaboratorGraph;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Records the collaborators of a user in the collaborator graph.
///
/// Implementations never fail: upstream errors are logged and reduce the
/// result instead of aborting it.
#[async_trait]
pub trait Expander: Send + Sync {
    /// Expands `username` and returns the number of collaborators recorded.
    async fn expand(&self, credential: &str, username: &str) -> usize;

    /// Returns the public profile of `username` for display.
    ///
    /// Falls back to a login-only profile when no details are available.
    async fn profile(&self, _credential: &str, username: &str) -> UserProfile {
        UserProfile::new(username)
    }
}

/// Expands users by querying the upstream API.
#[derive(Debug, Clone)]
pub struct GithubExpander {
    api: GithubApi,
    graph: Arc<CollaboratorGraph>,
}

impl GithubExpander {
    /// Creates an expander writing into `graph`.
    pub fn new(api: GithubApi, graph: Arc<CollaboratorGraph>) -> Self {
        Self { api, graph }
    }
}

#[async_trait]
impl Expander for GithubExpander {
    async fn expand(&self, credential: &str, username: &str) -> usize {
        info!(username, "Scanning for collaborators");

        let repos = match self.api.user_repos(credential, username).await {
            Ok(repos) => repos,
            Err(e) => {
                warn!(username, error = %e, "Failed to list repositories");
                Vec::new()
            }
        };

        let mut collaborators = BTreeSet::new();
        for repo in &repos {
            let owner = repo
                .owner
                .as_ref()
                .map_or(username, |owner| owner.login.as_str());

            match self
                .api
                .repo_contributors(credential, owner, &repo.name)
                .await
            {
                Ok(contributors) => {
                    collaborators.extend(contributors.into_iter().map(|c| c.login));
                }
                Err(e) => {
                    warn!(owner, repo = %repo.name, error = %e, "Failed to list contributors");
                }
            }
        }

        let count = self.graph.set_collaborators(username, collaborators);
        info!(username, repos = repos.len(), collaborators = count, "Expansion complete");
        count
    }

    async fn profile(&self, credential: &str, username: &str) -> UserProfile {
        match self.api.user(credential, username).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(username, error = %e, "Failed to fetch profile");
                UserProfile::new(username)
            }
        }
    }
}
