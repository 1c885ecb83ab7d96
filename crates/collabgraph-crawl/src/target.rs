//! Target detection.
//!
//! When a configured username is linked into a session's graph, the path back
//! to the root is reconstructed from the session's parent links and logged.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Watches for a single target username.
#[derive(Debug, Clone, Default)]
pub struct TargetWatch {
    target: Option<String>,
}

impl TargetWatch {
    /// Creates a watch. `None` disables detection.
    pub fn new(target: Option<String>) -> Self {
        Self { target }
    }

    /// Returns the watched username.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Called for every newly linked collaborator. Returns the root-to-target
    /// path when `collaborator` is the target.
    pub fn check(
        &self,
        collaborator: &str,
        parent: &str,
        links: &HashMap<String, String>,
        root: &str,
    ) -> Option<Vec<String>> {
        debug!(collaborator, parent, "Found a unique collaborator");

        if self.target.as_deref() != Some(collaborator) {
            return None;
        }

        let path = path_to(collaborator, links, root)?;
        info!(target = collaborator, path = %path.join(" -> "), "Target found");
        Some(path)
    }
}

/// Follows parent links from `target` back to `root`.
///
/// Returns the path ordered root first, or `None` if a link is missing or the
/// links loop without reaching `root`.
pub fn path_to(target: &str, links: &HashMap<String, String>, root: &str) -> Option<Vec<String>> {
    let mut path = vec![target.to_string()];
    let mut seen = HashSet::from([target]);
    let mut current = target;

    while current != root {
        let parent = links.get(current)?;
        if !seen.insert(parent.as_str()) {
            return None;
        }
        path.push(parent.clone());
        current = parent.as_str();
    }

    path.reverse();
    Some(path)
}
