//! bluevault-server binary.
//!
//! Reads `bluevault.toml` (or the path given with `--config`), opens the
//! SQLite submission store, wires the configured pinning backend and chain
//! executor into the lifecycle controller, and serves the JSON API under
//! `/api`.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use bluevault_core::{
  lifecycle::LifecycleController, mint::MintOrchestrator, store::SubmissionStore,
};
use bluevault_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "BlueVault submission and mint server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "bluevault.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load {}", cli.config.display()))?;

  let store_path = cfg.store_path();
  let store = SqliteStore::open_with_namespace(&store_path, &cfg.namespace)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  watch_store(&store);

  let pinner = cfg.pinning.build()?;
  let minter = MintOrchestrator::new(cfg.mint.build()?).with_timeout(cfg.mint.timeout());
  let controller = Arc::new(LifecycleController::new(store, pinner, minter, &cfg.recipient));

  let mut app = Router::new()
    .nest("/api", bluevault_api::api_router(controller))
    .layer(TraceLayer::new_for_http());
  if cfg.cors {
    app = app.layer(CorsLayer::permissive());
  }

  let address = cfg.address();
  tracing::info!(
    recipient = %cfg.recipient,
    pinning = ?cfg.pinning.backend,
    executor = ?cfg.mint.executor,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

/// Log every committed store revision.
fn watch_store(store: &SqliteStore) {
  let mut changes = store.subscribe();
  tokio::spawn(async move {
    while changes.changed().await.is_ok() {
      let revision = *changes.borrow_and_update();
      tracing::debug!(revision, "submission store changed");
    }
  });
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
