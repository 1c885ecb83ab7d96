//! Client-steered crawl sessions.
//!
//! A session grows a breadth-first tree of collaborators outward from one root
//! user and streams every newly linked user to its client. Two loops share the
//! session state:
//!
//! - the **driver** replays what the collaborator graph already knows, then
//!   expands the frontier one user at a time, gated on the pause flag and the
//!   root's requested depth, and sends the profiles of every newly linked
//!   collaborator;
//! - the **listener** applies client commands and wakes the driver.
//!
//! The state lock is never held across an expansion, so commands are applied
//! while the driver waits on upstream. The session ends when the client
//! disconnects or the shutdown token fires; an exhausted frontier only idles
//! the driver.

use crate::api::UserProfile;
use crate::error::CommandError;
use crate::expand::Expander;
use crate::protocol::{ClientCommand, Command, ServerMessage, Status};
use crate::target::TargetWatch;
use collabgraph_storage::{CollaboratorGraph, DEFAULT_REQUESTED_DEPTH};
use futures::{future, Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Channel carrying messages to the client.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Whether growth waits for a `continue` command before starting.
    pub start_paused: bool,
    /// Requested depth given to a root user seen for the first time.
    pub initial_requested_depth: i64,
    /// Username whose discovery is reported with its path from the root.
    pub target: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_paused: true,
            initial_requested_depth: DEFAULT_REQUESTED_DEPTH,
            target: None,
        }
    }
}

/// Mutable session state, guarded by one lock.
#[derive(Debug)]
struct SessionState {
    /// Users of the current level not yet expanded, then the next level.
    frontier: VecDeque<String>,
    /// Number of entries at the front of `frontier` that belong to the
    /// current level.
    remaining_in_level: usize,
    /// Every user linked in this session, mapped to the user it was linked
    /// through. The root maps to the empty string.
    visited: HashMap<String, String>,
    depth: i64,
    paused: bool,
    quit: bool,
    working: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    wake: Notify,
}

/// One client's crawl.
#[derive(Clone)]
pub struct CrawlSession {
    root: UserProfile,
    credential: String,
    graph: Arc<CollaboratorGraph>,
    expander: Arc<dyn Expander>,
    target: TargetWatch,
    shared: Arc<Shared>,
    outbox: Outbox,
}

impl std::fmt::Debug for CrawlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlSession")
            .field("root", &self.root.login)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl CrawlSession {
    /// Creates a session rooted at `root`.
    ///
    /// The root gets a graph entry with the configured initial depth unless
    /// one already exists.
    pub fn new(
        root: UserProfile,
        credential: impl Into<String>,
        graph: Arc<CollaboratorGraph>,
        expander: Arc<dyn Expander>,
        outbox: Outbox,
        options: SessionOptions,
    ) -> Self {
        graph.ensure_user(&root.login, options.initial_requested_depth);

        let state = SessionState {
            frontier: VecDeque::from([root.login.clone()]),
            remaining_in_level: 1,
            visited: HashMap::from([(root.login.clone(), String::new())]),
            depth: 0,
            paused: options.start_paused,
            quit: false,
            working: false,
        };

        Self {
            root,
            credential: credential.into(),
            graph,
            expander,
            target: TargetWatch::new(options.target),
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                wake: Notify::new(),
            }),
            outbox,
        }
    }

    /// Returns the root username.
    pub fn root(&self) -> &str {
        &self.root.login
    }

    /// Returns the current progress.
    pub fn status(&self) -> Status {
        let state = self.shared.state.lock();
        self.status_of(&state)
    }

    /// Runs the session until the command stream ends, yields an error, or
    /// `shutdown` fires.
    pub async fn run<S>(self, commands: S, shutdown: CancellationToken)
    where
        S: Stream<Item = Result<ClientCommand, CommandError>> + Send + 'static,
    {
        info!(root = %self.root.login, "Crawl session started");
        self.send(ServerMessage::Root {
            root: self.root.clone(),
        });

        let replayed = self.replay().await;
        debug!(root = %self.root.login, replayed, "Replayed stored graph");

        let listener = tokio::spawn(self.clone().listen(commands, shutdown));
        self.drive().await;

        if let Err(e) = listener.await {
            warn!(root = %self.root.login, error = %e, "Command listener failed");
        }
        info!(root = %self.root.login, "Crawl session ended");
    }

    /// Streams already-expanded users from the graph without expanding
    /// them again. Returns the number of users replayed.
    ///
    /// Users are replayed in frontier order while their level is within the
    /// requested depth and they have been expanded before. Live growth
    /// resumes at the first user that fails either condition, with the
    /// session state left exactly as if the replayed users had been expanded
    /// live.
    pub async fn replay(&self) -> usize {
        let mut replayed = 0;

        loop {
            let (username, linked) = {
                let mut state = self.shared.state.lock();
                if state.remaining_in_level == 0
                    || state.depth > self.graph.requested_depth(&self.root.login)
                {
                    break;
                }

                let Some(entry) = state
                    .frontier
                    .front()
                    .and_then(|username| self.graph.get(username))
                    .filter(|entry| entry.is_expanded())
                else {
                    break;
                };
                let Some(username) = state.frontier.pop_front() else {
                    break;
                };

                let linked = self.link(&mut state, &username, entry.collaborators, false);
                self.finish_user(&mut state, false);
                (username, linked)
            };

            self.send_discovery(username, linked).await;
            replayed += 1;
        }

        replayed
    }

    /// Expands the frontier one user at a time until it is exhausted or the
    /// session quits.
    async fn drive(&self) {
        loop {
            {
                let state = self.shared.state.lock();
                if state.quit || state.remaining_in_level == 0 {
                    break;
                }
            }

            let Some(username) = self.next_user().await else {
                return;
            };

            self.expander.expand(&self.credential, &username).await;
            let collaborators = self.graph.collaborators(&username).unwrap_or_default();

            let linked = {
                let mut state = self.shared.state.lock();
                self.link(&mut state, &username, collaborators, true)
            };
            self.send_discovery(username, linked).await;

            let mut state = self.shared.state.lock();
            self.finish_user(&mut state, true);
        }

        let mut state = self.shared.state.lock();
        if !state.quit {
            state.working = false;
            let status = self.status_of(&state);
            self.send(ServerMessage::Status(status));
            info!(root = %self.root.login, depth = state.depth, "Frontier exhausted");
        }
    }

    /// Waits until growth may proceed, then dequeues the next user. Returns
    /// `None` once the session quits.
    async fn next_user(&self) -> Option<String> {
        loop {
            let woken = self.shared.wake.notified();
            {
                let mut state = self.shared.state.lock();
                if state.quit {
                    return None;
                }

                let requested = self.graph.requested_depth(&self.root.login);
                if !state.paused && state.depth <= requested {
                    state.working = true;
                    let status = self.status_of(&state);
                    self.send(ServerMessage::Status(status));
                    return state.frontier.pop_front();
                }

                debug!(
                    root = %self.root.login,
                    paused = state.paused,
                    depth = state.depth,
                    requested,
                    "Growth stopped"
                );
                state.working = false;
                let status = self.status_of(&state);
                self.send(ServerMessage::Status(status));
            }
            woken.await;
        }
    }

    /// Applies client commands until the stream ends or shutdown fires, then
    /// marks the session as quit.
    async fn listen<S>(self, commands: S, shutdown: CancellationToken)
    where
        S: Stream<Item = Result<ClientCommand, CommandError>>,
    {
        let mut commands = std::pin::pin!(commands);

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                next = commands.next() => next,
            };

            match next {
                Some(Ok(command)) => self.apply(command.command),
                Some(Err(e)) => {
                    debug!(root = %self.root.login, error = %e, "Unable to read command");
                    break;
                }
                None => break,
            }
        }

        self.shared.state.lock().quit = true;
        self.shared.wake.notify_one();
        debug!(root = %self.root.login, "Command listener stopped");
    }

    fn apply(&self, command: Command) {
        let mut state = self.shared.state.lock();
        match command {
            Command::Plus => {
                self.graph.adjust_requested_depth(&self.root.login, 1);
            }
            Command::Minus => {
                self.graph.adjust_requested_depth(&self.root.login, -1);
            }
            Command::Pause => state.paused = true,
            Command::Continue => state.paused = false,
            Command::Unknown => debug!(root = %self.root.login, "Ignoring unknown command"),
        }

        let status = self.status_of(&state);
        self.send(ServerMessage::Status(status));
        drop(state);
        self.shared.wake.notify_one();
    }

    /// Counts one user of the current level as done. After the last one the
    /// session moves to the next level, announcing the finished level when
    /// `announce` is set.
    fn finish_user(&self, state: &mut SessionState, announce: bool) {
        state.remaining_in_level = state.remaining_in_level.saturating_sub(1);
        if state.remaining_in_level > 0 {
            return;
        }

        if announce {
            let status = self.status_of(state);
            self.send(ServerMessage::Status(status));
        }
        state.depth += 1;
        state.remaining_in_level = state.frontier.len();
        debug!(root = %self.root.login, depth = state.depth, "Level complete");
    }

    /// Sends `linked` to the client as one discovery, with each collaborator's
    /// profile.
    async fn send_discovery(&self, username: String, linked: Vec<String>) {
        let collaborators = future::join_all(
            linked
                .iter()
                .map(|login| self.expander.profile(&self.credential, login)),
        )
        .await;
        self.send(ServerMessage::Discovery {
            username,
            collaborators,
        });
    }

    /// Links every not-yet-visited collaborator of `username` into the tree.
    /// Returns the newly linked users in input order.
    fn link(
        &self,
        state: &mut SessionState,
        username: &str,
        collaborators: Vec<String>,
        watch_target: bool,
    ) -> Vec<String> {
        let mut linked = Vec::new();
        for collaborator in collaborators {
            if state.visited.contains_key(&collaborator) {
                continue;
            }
            state
                .visited
                .insert(collaborator.clone(), username.to_string());
            state.frontier.push_back(collaborator.clone());
            if watch_target {
                self.target
                    .check(&collaborator, username, &state.visited, &self.root.login);
            }
            linked.push(collaborator);
        }
        linked
    }

    fn status_of(&self, state: &SessionState) -> Status {
        Status {
            working: state.working,
            paused: state.paused,
            depth: state.depth,
            max_depth: self.graph.requested_depth(&self.root.login),
        }
    }

    fn send(&self, message: ServerMessage) {
        if self.outbox.send(message).is_err() {
            debug!(root = %self.root.login, "Client outbox closed");
        }
    }
}
