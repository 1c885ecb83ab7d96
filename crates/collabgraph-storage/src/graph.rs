//! The collaborator graph.
//!
//! One process-wide map from username to [`UserEntry`], shared by every crawl
//! session. Each method takes the map lock once, so individual operations are
//! atomic, but nothing spans calls: a session that writes an entry must not
//! assume it is unchanged on its next read, because another session may have
//! expanded the same user in between.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Requested depth given to users that nobody is actively growing.
pub const DEFAULT_REQUESTED_DEPTH: i64 = 99;

/// What is known about one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Depth the owning session's client has asked to grow to. No floor.
    pub requested_depth: i64,
    /// Known collaborators, sorted and deduplicated.
    pub collaborators: Vec<String>,
    /// When expansion last completed for this user.
    pub last_expanded: Option<DateTime<Utc>>,
}

impl UserEntry {
    /// Creates an entry with no known collaborators.
    pub fn new(requested_depth: i64) -> Self {
        Self {
            requested_depth,
            collaborators: Vec::new(),
            last_expanded: None,
        }
    }

    /// Returns true once the collaborator list reflects a completed expansion.
    pub fn is_expanded(&self) -> bool {
        self.last_expanded.is_some()
    }
}

impl Default for UserEntry {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTED_DEPTH)
    }
}

/// Shared username -> [`UserEntry`] map.
#[derive(Debug, Default)]
pub struct CollaboratorGraph {
    users: RwLock<HashMap<String, UserEntry>>,
}

impl CollaboratorGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph from previously saved entries.
    pub fn from_entries(entries: HashMap<String, UserEntry>) -> Self {
        Self {
            users: RwLock::new(entries),
        }
    }

    /// Inserts an entry for `username` unless one exists. Returns true if
    /// the user was new.
    pub fn ensure_user(&self, username: &str, requested_depth: i64) -> bool {
        let mut users = self.users.write();
        if users.contains_key(username) {
            return false;
        }
        users.insert(username.to_string(), UserEntry::new(requested_depth));
        true
    }

    /// Returns a copy of the entry for `username`.
    pub fn get(&self, username: &str) -> Option<UserEntry> {
        self.users.read().get(username).cloned()
    }

    /// Returns true if `username` has an entry.
    pub fn contains(&self, username: &str) -> bool {
        self.users.read().contains_key(username)
    }

    /// Returns the requested depth for `username`, or the default if unknown.
    pub fn requested_depth(&self, username: &str) -> i64 {
        self.users
            .read()
            .get(username)
            .map_or(DEFAULT_REQUESTED_DEPTH, |entry| entry.requested_depth)
    }

    /// Adds `delta` to the requested depth of `username` and returns the new
    /// value. Creates the entry with the default depth first if needed.
    pub fn adjust_requested_depth(&self, username: &str, delta: i64) -> i64 {
        let mut users = self.users.write();
        let entry = users.entry(username.to_string()).or_default();
        entry.requested_depth = entry.requested_depth.saturating_add(delta);
        entry.requested_depth
    }

    /// Replaces the collaborator list of `username` with the sorted,
    /// deduplicated `collaborators`. The requested depth is kept.
    pub fn set_collaborators<I, S>(&self, username: &str, collaborators: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = collaborators.into_iter().map(Into::into).collect();
        let count = sorted.len();

        let mut users = self.users.write();
        let entry = users.entry(username.to_string()).or_default();
        entry.collaborators = sorted.into_iter().collect();
        entry.last_expanded = Some(Utc::now());
        count
    }

    /// Returns the collaborators of `username`, if the user is known.
    pub fn collaborators(&self, username: &str) -> Option<Vec<String>> {
        self.users
            .read()
            .get(username)
            .map(|entry| entry.collaborators.clone())
    }

    /// Returns a copy of every entry, for snapshotting.
    pub fn entries(&self) -> HashMap<String, UserEntry> {
        self.users.read().clone()
    }

    /// Replaces the graph contents.
    pub fn restore(&self, entries: HashMap<String, UserEntry>) {
        *self.users.write() = entries;
    }

    /// Returns the number of known users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns true if no users are known.
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_user_keeps_existing_entry() {
        let graph = CollaboratorGraph::new();
        assert!(graph.ensure_user("alice", 3));
        graph.set_collaborators("alice", ["bob"]);

        assert!(!graph.ensure_user("alice", 7));
        let entry = graph.get("alice").unwrap();
        assert_eq!(entry.requested_depth, 3);
        assert_eq!(entry.collaborators, vec!["bob"]);
    }

    #[test]
    fn test_set_collaborators_sorts_and_dedups() {
        let graph = CollaboratorGraph::new();
        let count = graph.set_collaborators("alice", ["carol", "bob", "carol", "alice"]);

        assert_eq!(count, 3);
        assert_eq!(
            graph.collaborators("alice").unwrap(),
            vec!["alice", "bob", "carol"]
        );
    }

    #[test]
    fn test_set_collaborators_replaces_wholesale() {
        let graph = CollaboratorGraph::new();
        graph.set_collaborators("alice", ["bob", "carol"]);
        graph.set_collaborators("alice", ["dave"]);

        assert_eq!(graph.collaborators("alice").unwrap(), vec!["dave"]);
    }

    #[test]
    fn test_set_collaborators_preserves_depth() {
        let graph = CollaboratorGraph::new();
        graph.ensure_user("alice", 4);
        graph.set_collaborators("alice", ["bob"]);

        let entry = graph.get("alice").unwrap();
        assert_eq!(entry.requested_depth, 4);
        assert!(entry.is_expanded());
    }

    #[test]
    fn test_new_user_is_not_expanded() {
        let graph = CollaboratorGraph::new();
        graph.ensure_user("alice", 0);
        assert!(!graph.get("alice").unwrap().is_expanded());
    }

    #[test]
    fn test_adjust_depth_has_no_floor() {
        let graph = CollaboratorGraph::new();
        graph.ensure_user("alice", 0);

        assert_eq!(graph.adjust_requested_depth("alice", -1), -1);
        assert_eq!(graph.adjust_requested_depth("alice", -1), -2);
        assert_eq!(graph.adjust_requested_depth("alice", 3), 1);
        assert_eq!(graph.requested_depth("alice"), 1);
    }

    #[test]
    fn test_adjust_depth_creates_missing_user() {
        let graph = CollaboratorGraph::new();
        assert_eq!(
            graph.adjust_requested_depth("ghost", 1),
            DEFAULT_REQUESTED_DEPTH + 1
        );
        assert!(graph.contains("ghost"));
    }

    #[test]
    fn test_entries_and_restore() {
        let graph = CollaboratorGraph::new();
        graph.set_collaborators("alice", ["bob"]);
        let entries = graph.entries();

        let other = CollaboratorGraph::from_entries(entries.clone());
        assert_eq!(other.entries(), entries);

        other.restore(HashMap::new());
        assert!(other.is_empty());
        assert_eq!(graph.len(), 1);
    }
}
