//! Periodic snapshotting of the cache and graph.

use collabgraph_storage::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::api::AppState;

/// Saves one snapshot of `state`.
///
/// Encoding and disk I/O run on the blocking pool.
pub async fn save_snapshot(state: &AppState, store: &Arc<SnapshotStore>) -> anyhow::Result<()> {
    let snapshot = state.snapshot();
    let requests = snapshot.requests.len();
    let users = snapshot.collab_graph.len();

    let store = store.clone();
    tokio::task::spawn_blocking(move || store.save(&snapshot)).await??;

    debug!(requests, users, "Saved data");
    Ok(())
}

/// Saves a snapshot every `interval` until `shutdown` fires.
///
/// A failed save is logged and retried on the next tick.
pub async fn autosave(
    state: AppState,
    store: Arc<SnapshotStore>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    info!(interval_secs = interval.as_secs(), path = %store.path().display(), "Autosave started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = save_snapshot(&state, &store).await {
                    error!(error = %e, "Autosave failed");
                }
            }
        }
    }
    debug!("Autosave stopped");
}
