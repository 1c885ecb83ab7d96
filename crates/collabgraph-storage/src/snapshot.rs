//! Compressed on-disk snapshots.
//!
//! A snapshot is the full response cache plus the full collaborator graph,
//! `bincode`-encoded and gzip-compressed into one file. Writes go to a
//! temporary file next to the target and are renamed into place, so a reader
//! never observes a half-written snapshot.

use crate::graph::UserEntry;
use crate::Result;
use collabgraph_cache::CacheEntry;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Everything persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Response cache entries by cache key.
    pub requests: HashMap<String, CacheEntry>,
    /// Collaborator graph entries by username.
    pub collab_graph: HashMap<String, UserEntry>,
}

impl Snapshot {
    /// Creates a snapshot from the two maps.
    pub fn new(
        requests: HashMap<String, CacheEntry>,
        collab_graph: HashMap<String, UserEntry>,
    ) -> Self {
        Self {
            requests,
            collab_graph,
        }
    }
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot.
    ///
    /// A missing file is the normal first-run state and yields an empty
    /// snapshot. Any other failure, including corrupt contents, is an error.
    pub fn load(&self) -> Result<Snapshot> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Snapshot not found, loaded no data");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: Snapshot = bincode::deserialize_from(decoder)?;

        debug!(
            path = %self.path.display(),
            requests = snapshot.requests.len(),
            users = snapshot.collab_graph.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Writes the snapshot, replacing any previous file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp = NamedTempFile::new_in(dir)?;
        let mut encoder = GzEncoder::new(BufWriter::new(temp), Compression::default());
        bincode::serialize_into(&mut encoder, snapshot)?;

        let temp = encoder
            .finish()?
            .into_inner()
            .map_err(io::IntoInnerError::into_error)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            path = %self.path.display(),
            requests = snapshot.requests.len(),
            users = snapshot.collab_graph.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}
