//! Jukebox Player (jbx-player) - Main entry point
//!
//! Wires the session manager to its external collaborators and runs the
//! periodic inactive-song sweep until shutdown. The collaborators below are
//! logging placeholders; a deployment substitutes its platform adapters.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jbx_player::coordinator::{DisplayWriter, RefreshPayload};
use jbx_player::playback::{AudioSink, PlaybackSignal};
use jbx_player::queue::{SongQueue, INACTIVE_RETENTION};
use jbx_player::resolver::NullResolver;
use jbx_player::session::{AllowAll, SessionManager, SinkFactory};

/// How often expired inactive songs are purged
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Command-line arguments for jbx-player
#[derive(Parser, Debug)]
#[command(name = "jbx-player")]
#[command(about = "Per-tenant music playback queue service")]
#[command(version)]
struct Args {
    /// Database file path
    #[arg(short, long, env = "JBX_DATABASE")]
    database: Option<String>,

    /// Debounce window for display refreshes, in milliseconds
    #[arg(long, default_value = "150", env = "JBX_DEBOUNCE_MS")]
    debounce_ms: u64,
}

/// Display writer that only logs; stands in for a platform adapter
struct LogWriter;

#[async_trait::async_trait]
impl DisplayWriter for LogWriter {
    async fn write(
        &self,
        tenant_id: &str,
        payload: RefreshPayload,
    ) -> jbx_player::Result<()> {
        debug!("Display refresh for tenant {} ({:?})", tenant_id, payload);
        Ok(())
    }
}

/// Sink that accepts every play; stands in for a platform adapter
struct LogSink;

#[async_trait::async_trait]
impl AudioSink for LogSink {
    async fn play(&self, locator: &str, start_at_secs: u64) -> jbx_player::Result<()> {
        debug!("Sink play {} from {}s", locator, start_at_secs);
        Ok(())
    }
    async fn stop(&self) {}
    async fn pause(&self) {}
    async fn resume(&self) {}
    async fn release(&self) {}
}

struct LogSinkFactory;

impl SinkFactory for LogSinkFactory {
    fn create(
        &self,
        _tenant_id: &str,
        _signals: mpsc::UnboundedSender<PlaybackSignal>,
    ) -> Arc<dyn AudioSink> {
        Arc::new(LogSink)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jbx_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let db_path = jbx_common::config::resolve_database_path(
        args.database.as_deref(),
        "JBX_DATABASE",
    )
    .context("Failed to resolve database path")?;
    info!("Database: {}", db_path.display());

    let db = jbx_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let _manager = SessionManager::new(
        db.clone(),
        Arc::new(NullResolver),
        Arc::new(LogSinkFactory),
        Arc::new(AllowAll),
        Arc::new(LogWriter),
        Duration::from_millis(args.debounce_ms),
    );
    info!("Session manager initialized");

    // Periodic purge of expired inactive songs
    let sweep_db = db.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = SongQueue::sweep_inactive(&sweep_db, INACTIVE_RETENTION).await {
                tracing::warn!("Inactive sweep failed: {}", e);
            }
        }
    });

    shutdown_signal().await;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
