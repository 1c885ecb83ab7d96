//! Live channel message types.
//!
//! Server messages are bare JSON objects distinguished by their fields:
//!
//! ```json
//! {"root":{"login":"octocat"}}
//! {"username":"octocat","collaborators":[{"login":"hubot","followers":3}]}
//! {"working":true,"paused":false,"depth":1,"max_depth":99}
//! ```
//!
//! Clients send `{"command":"plus"|"minus"|"pause"|"continue"}`.

use crate::api::UserProfile;
use crate::error::CommandError;
use serde::{Deserialize, Serialize};

/// A message pushed from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Identity of the session's root user. Sent once, first.
    Root {
        /// Profile of the root user.
        root: UserProfile,
    },
    /// Collaborators newly linked to the graph through `username`.
    Discovery {
        /// Expanded user.
        username: String,
        /// Profiles of the collaborators not previously visited in this
        /// session, in link order.
        collaborators: Vec<UserProfile>,
    },
    /// Session progress.
    Status(Status),
}

impl ServerMessage {
    /// Serializes the message for the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Progress of a crawl session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Whether the driver is currently expanding.
    pub working: bool,
    /// Whether the client has paused the session.
    pub paused: bool,
    /// BFS level currently being processed.
    pub depth: i64,
    /// Root user's requested depth.
    pub max_depth: i64,
}

/// A command sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientCommand {
    /// Requested action.
    #[serde(default)]
    pub command: Command,
}

impl ClientCommand {
    /// Creates a command.
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    /// Parses a text frame.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Client actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Raise the root's requested depth by one.
    Plus,
    /// Lower the root's requested depth by one.
    Minus,
    /// Stop expanding after the current user.
    Pause,
    /// Resume expanding.
    Continue,
    /// Anything else. Ignored, but still answered with a status.
    #[default]
    #[serde(other)]
    Unknown,
}
