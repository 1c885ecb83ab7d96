//! Expansion against a mock upstream.

use collabgraph_cache::ResponseCache;
use collabgraph_crawl::{Expander, GithubApi, GithubExpander, UserProfile};
use collabgraph_storage::CollaboratorGraph;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn expander(server: &MockServer) -> (GithubExpander, Arc<CollaboratorGraph>) {
    let cache = Arc::new(ResponseCache::with_defaults().unwrap());
    let graph = Arc::new(CollaboratorGraph::new());
    let api = GithubApi::new(cache, server.uri());
    (GithubExpander::new(api, graph.clone()), graph)
}

#[tokio::test]
async fn test_expand_merges_contributors_sorted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .and(query_param("per_page", "100"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "one", "owner": {"login": "alice"}},
            {"name": "forked", "owner": {"login": "org"}},
            {"name": "bare"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/one/contributors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"login": "carol"}, {"login": "alice"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/org/forked/contributors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"login": "bob"}, {"login": "carol"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/bare/contributors"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (expander, graph) = expander(&server);
    assert_eq!(expander.expand("token", "alice").await, 3);

    let entry = graph.get("alice").unwrap();
    assert_eq!(entry.collaborators, vec!["alice", "bob", "carol"]);
    assert!(entry.is_expanded());
}

#[tokio::test]
async fn test_failed_repo_list_records_no_collaborators() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/ghost/repos"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let (expander, graph) = expander(&server);
    assert_eq!(expander.expand("token", "ghost").await, 0);

    let entry = graph.get("ghost").unwrap();
    assert!(entry.collaborators.is_empty());
    assert!(entry.is_expanded());
}

#[tokio::test]
async fn test_failed_contributor_list_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "broken", "owner": {"login": "alice"}},
            {"name": "fine", "owner": {"login": "alice"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/broken/contributors"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/fine/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "bob"}])))
        .mount(&server)
        .await;

    let (expander, graph) = expander(&server);
    expander.expand("token", "alice").await;

    assert_eq!(graph.collaborators("alice").unwrap(), vec!["bob"]);
}

#[tokio::test]
async fn test_malformed_contributor_body_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"name": "odd", "owner": {"login": "alice"}}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/odd/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let (expander, graph) = expander(&server);
    assert_eq!(expander.expand("token", "alice").await, 0);
    assert!(graph.get("alice").unwrap().is_expanded());
}

#[tokio::test]
async fn test_expand_preserves_requested_depth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (expander, graph) = expander(&server);
    graph.ensure_user("alice", 3);
    expander.expand("token", "alice").await;

    assert_eq!(graph.requested_depth("alice"), 3);
}

#[tokio::test]
async fn test_current_user_profile() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "alice",
            "avatar_url": "https://avatars.example.com/alice",
            "id": 42
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let cache = Arc::new(ResponseCache::with_defaults().unwrap());
    let api = GithubApi::new(cache, server.uri());

    let profile = api.current_user("token").await.unwrap();
    assert_eq!(profile.login, "alice");
    assert!(api.current_user("wrong").await.is_err());
}

#[tokio::test]
async fn test_profile_fetched_through_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/bob"))
        .and(header("authorization", "Bearer token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"bob-v1\"")
                .set_body_json(json!({
                    "login": "bob",
                    "avatar_url": "https://avatars.example.com/bob",
                    "public_repos": 12,
                    "followers": 7,
                    "following": 3,
                    "created_at": "2015-04-01T09:30:00Z"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (expander, _graph) = expander(&server);
    let profile = expander.profile("token", "bob").await;
    assert_eq!(profile.avatar_url.as_deref(), Some("https://avatars.example.com/bob"));
    assert_eq!(profile.public_repos, Some(12));
    assert_eq!(profile.followers, Some(7));
    assert_eq!(profile.following, Some(3));
    assert_eq!(profile.created_at.as_deref(), Some("2015-04-01T09:30:00Z"));

    // Fresh entry, no second upstream call.
    assert_eq!(expander.profile("token", "bob").await, profile);
}

#[tokio::test]
async fn test_missing_profile_falls_back_to_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let (expander, _graph) = expander(&server);
    assert_eq!(expander.profile("token", "ghost").await, UserProfile::new("ghost"));
}
