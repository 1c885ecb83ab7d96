//! Collaborator graph and persistent snapshots for collabgraph.
//!
//! The [`CollaboratorGraph`] is the cumulative, cross-session record of who
//! collaborates with whom. [`SnapshotStore`] writes it, together with the
//! response cache, to a single gzip-compressed file.

mod error;
mod graph;
mod snapshot;

pub use error::StorageError;
pub use graph::{CollaboratorGraph, UserEntry, DEFAULT_REQUESTED_DEPTH};
pub use snapshot::{Snapshot, SnapshotStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
