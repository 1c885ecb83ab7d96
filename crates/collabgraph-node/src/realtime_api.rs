//! Live crawl over WebSocket.
//!
//! - `/ws` - authenticates the caller, then runs one crawl session rooted at
//!   the caller's own user for the lifetime of the connection
//!
//! The credential is read from an `Authorization: Bearer` header or, for
//! browsers, from the `gho` cookie set by the login flow. It is verified by
//! fetching the caller's profile through the response cache before the
//! upgrade is accepted.
//!
//! ## WebSocket Protocol
//!
//! ```json
//! // server -> client
//! {"root": {"login": "octocat", "avatar_url": "..."}}
//! {"username": "octocat", "collaborators": [{"login": "hubot", "avatar_url": "..."}]}
//! {"working": true, "paused": false, "depth": 1, "max_depth": 99}
//!
//! // client -> server
//! {"command": "plus" | "minus" | "pause" | "continue"}
//! ```

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use collabgraph_crawl::{ClientCommand, CommandError, CrawlSession, ServerMessage, UserProfile};
use futures_util::{future, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AppState};

/// Cookie carrying the credential for browser clients.
pub const CREDENTIAL_COOKIE: &str = "gho";

/// Create the real-time API routes.
pub fn realtime_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// Extracts the caller's credential from the request headers.
///
/// A bearer token takes precedence over the cookie.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == CREDENTIAL_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// WebSocket upgrade handler.
async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let credential = credential_from_headers(&headers).ok_or(ApiError::MissingCredential)?;

    let profile = state.api.current_user(&credential).await.map_err(|e| {
        warn!(error = %e, "Credential rejected");
        ApiError::Unauthorized
    })?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, profile, credential))
        .into_response())
}

/// Runs one crawl session over a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState, profile: UserProfile, credential: String) {
    let root = profile.login.clone();
    info!(root = %root, "WebSocket client connected");

    let (mut ws_sender, ws_receiver) = socket.split();
    let (outbox, mut messages) = mpsc::unbounded_channel::<ServerMessage>();

    // Forward session output to the socket.
    let send_root = root.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!(root = %send_root, error = %e, "Failed to encode message");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        debug!(root = %send_root, "Send task ended");
    });

    let commands = ws_receiver.filter_map(|msg| future::ready(read_command(msg)));

    let session = CrawlSession::new(
        profile,
        credential,
        state.graph.clone(),
        state.expander.clone(),
        outbox,
        state.config.session_options(),
    );
    session.run(commands, state.shutdown.child_token()).await;

    send_task.abort();
    info!(root = %root, "WebSocket client disconnected");
}

/// Maps one frame to a session command. Control frames yield nothing.
fn read_command(msg: Result<Message, axum::Error>) -> Option<Result<ClientCommand, CommandError>> {
    match msg {
        Ok(Message::Text(text)) => {
            let text: &str = &text;
            Some(ClientCommand::parse(text))
        }
        Ok(Message::Binary(_)) => Some(Err(CommandError::UnsupportedFrame("binary"))),
        Ok(Message::Close(_)) => Some(Err(CommandError::Closed)),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) => Some(Err(CommandError::Connection(e.to_string()))),
    }
}
