//! Router tests for the HTTP surface.

use axum::{body::Body, http::Request};
use collabgraph_node::api::{create_router, AppState};
use collabgraph_node::config::NodeConfig;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_state(api_base_url: &str) -> AppState {
    let config = NodeConfig {
        api_base_url: api_base_url.to_string(),
        ..NodeConfig::default()
    };
    AppState::new(config).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let state = create_test_state("http://127.0.0.1:1");
    state.graph.ensure_user("alice", 1);
    let app = create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 1);
    assert_eq!(body["cached_requests"], 0);
}

#[tokio::test]
async fn test_ws_without_credential_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice"})))
        .expect(0)
        .mount(&server)
        .await;

    let app = create_router(create_test_state(&server.uri()));
    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(json_body(response).await["error"], "missing credential");
}

#[tokio::test]
async fn test_ws_with_rejected_credential_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_router(create_test_state(&server.uri()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header("cookie", "gho=expired")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_ws_with_valid_credential_requires_upgrade() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_router(create_test_state(&server.uri()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws")
                .header("authorization", "Bearer good")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), 401);
    assert!(response.status().is_client_error());
}
