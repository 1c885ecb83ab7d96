//! Upstream REST API client.
//!
//! Thin typed wrapper over the three read-only endpoints the crawler uses.
//! Every call goes through the shared [`ResponseCache`].

use crate::error::{CrawlError, Result};
use collabgraph_cache::{CachedResponse, ResponseCache};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default upstream API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Page size requested for list endpoints.
const PER_PAGE: u32 = 100;

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Login name.
    pub login: String,
    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Profile page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// Number of public repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_repos: Option<u64>,
    /// Follower count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    /// Number of users this user follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
    /// Account creation time, as upstream formats it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Creates a profile with only a login.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            avatar_url: None,
            name: None,
            html_url: None,
            public_repos: None,
            followers: None,
            following: None,
            created_at: None,
        }
    }
}

/// Owner of a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryOwner {
    /// Owner login.
    pub login: String,
}

/// A repository listed for a user.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Repository owner, when upstream includes it.
    #[serde(default)]
    pub owner: Option<RepositoryOwner>,
}

/// A contributor to a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct Contributor {
    /// Contributor login.
    pub login: String,
}

/// Typed client for the upstream API.
#[derive(Debug, Clone)]
pub struct GithubApi {
    cache: Arc<ResponseCache>,
    base_url: String,
}

impl GithubApi {
    /// Creates a client rooted at `base_url`.
    pub fn new(cache: Arc<ResponseCache>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { cache, base_url }
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Returns the profile of the user owning `credential`.
    pub async fn current_user(&self, credential: &str) -> Result<UserProfile> {
        let response = self.get(credential, "/user").await?;
        Ok(response.json()?)
    }

    /// Returns the profile of `username`.
    pub async fn user(&self, credential: &str, username: &str) -> Result<UserProfile> {
        let response = self.get(credential, &format!("/users/{username}")).await?;
        Ok(response.json()?)
    }

    /// Lists the repositories of `username`.
    pub async fn user_repos(&self, credential: &str, username: &str) -> Result<Vec<Repository>> {
        let path = format!("/users/{username}/repos?per_page={PER_PAGE}");
        self.get_list(credential, &path).await
    }

    /// Lists the contributors of `owner/repo`.
    pub async fn repo_contributors(
        &self,
        credential: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Contributor>> {
        let path = format!("/repos/{owner}/{repo}/contributors?per_page={PER_PAGE}");
        self.get_list(credential, &path).await
    }

    async fn get_list<T: DeserializeOwned>(&self, credential: &str, path: &str) -> Result<Vec<T>> {
        let response = self.get(credential, path).await?;
        // Empty repositories answer 204 with no body.
        if response.body.is_empty() {
            return Ok(Vec::new());
        }
        Ok(response.json()?)
    }

    async fn get(&self, credential: &str, path: &str) -> Result<CachedResponse> {
        let url = format!("{}{path}", self.base_url);
        let response = self.cache.fetch(credential, "GET", &url).await?;
        if response.is_error() {
            return Err(CrawlError::Upstream {
                status: response.status,
                url,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_ignores_unknown_fields() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"login":"octocat","id":1,"avatar_url":"https://a/1","site_admin":false}"#,
        )
        .unwrap();
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://a/1"));
        assert!(profile.name.is_none());
    }

    #[test]
    fn test_profile_keeps_account_stats() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"login":"octocat","public_repos":8,"followers":20,"following":0,"created_at":"2011-01-25T18:44:36Z"}"#,
        )
        .unwrap();
        assert_eq!(profile.public_repos, Some(8));
        assert_eq!(profile.followers, Some(20));
        assert_eq!(profile.following, Some(0));
        assert_eq!(profile.created_at.as_deref(), Some("2011-01-25T18:44:36Z"));

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["followers"], 20);
        assert!(json.get("avatar_url").is_none());
    }

    #[test]
    fn test_profile_serialization_skips_missing_fields() {
        let json = serde_json::to_string(&UserProfile::new("octocat")).unwrap();
        assert_eq!(json, r#"{"login":"octocat"}"#);
    }

    #[test]
    fn test_repository_owner_optional() {
        let repos: Vec<Repository> = serde_json::from_str(
            r#"[{"name":"a","owner":{"login":"octocat"}},{"name":"b"}]"#,
        )
        .unwrap();
        assert_eq!(repos[0].owner.as_ref().unwrap().login, "octocat");
        assert!(repos[1].owner.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let cache = Arc::new(ResponseCache::with_defaults().unwrap());
        let api = GithubApi::new(cache, "https://api.example.com/");
        assert_eq!(api.base_url, "https://api.example.com");
    }
}
