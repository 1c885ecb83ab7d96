//! Collabgraph Node - live collaborator graph exploration server.

use anyhow::Context;
use clap::Parser;
use collabgraph_node::api::{create_router, AppState};
use collabgraph_node::config::{NodeConfig, OAuthApp};
use collabgraph_node::observability::{init_logging, LogFormat};
use collabgraph_node::persistence::{autosave, save_snapshot};
use collabgraph_storage::SnapshotStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collabgraph Node - explore who works with whom
#[derive(Parser, Debug)]
#[command(name = "collabgraph-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, env = "COLLABGRAPH_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Snapshot file
    #[arg(long, env = "COLLABGRAPH_SNAPSHOT", default_value = "./cache.gz")]
    snapshot: PathBuf,

    /// Path to a YAML configuration file
    #[arg(short, long, env = "COLLABGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// OAuth client identifier
    #[arg(long, env = "GHO_CLIENT_ID", hide_env_values = true)]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "GHO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, LogFormat::parse(&args.log_format));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting collabgraph node");

    let oauth = OAuthApp::new(args.client_id, &args.client_secret)
        .context("missing OAuth client configuration")?;
    tracing::info!(client_id = %oauth.client_id, "OAuth client registered");

    let config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    tracing::info!(
        addr = %args.addr,
        snapshot = %args.snapshot.display(),
        api_base_url = %config.api_base_url,
        start_paused = config.start_paused,
        target = ?config.target,
        "Node configuration"
    );

    let store = Arc::new(SnapshotStore::new(&args.snapshot));
    let snapshot = store
        .load()
        .with_context(|| format!("failed to load snapshot {}", args.snapshot.display()))?;
    tracing::info!(
        requests = snapshot.requests.len(),
        users = snapshot.collab_graph.len(),
        "Loaded data"
    );

    let autosave_interval = config.autosave_interval();
    let state = AppState::new(config)?;
    state.restore(snapshot);

    let shutdown = state.shutdown.clone();
    let autosave_task = tokio::spawn(autosave(
        state.clone(),
        store.clone(),
        autosave_interval,
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "Listening");

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    if let Err(e) = autosave_task.await {
        tracing::warn!(error = %e, "Autosave task failed");
    }
    save_snapshot(&state, &store)
        .await
        .context("failed to save snapshot on shutdown")?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, cancelling `shutdown` so open sessions end too.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
