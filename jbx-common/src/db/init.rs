//! Database initialization
//!
//! Creates the database file on first run and brings the schema up
//! (idempotent, safe to call on every startup).

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows concurrent readers while one writer advances the queue
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
///
/// Exposed separately so tests can run against `sqlite::memory:`.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queues (
            tenant_id        TEXT PRIMARY KEY,
            owner_id         TEXT NOT NULL,
            channel_ref      TEXT,
            message_ref      TEXT,
            thread_ref       TEXT,
            page_offset      INTEGER NOT NULL DEFAULT 0,
            options          TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            guid             TEXT PRIMARY KEY,
            tenant_id        TEXT NOT NULL,
            position         INTEGER NOT NULL,
            added_at         TEXT NOT NULL,
            locator          TEXT NOT NULL,
            name             TEXT NOT NULL,
            short_name       TEXT,
            duration_secs    INTEGER NOT NULL,
            duration_display TEXT NOT NULL,
            active           INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_songs_tenant_position ON songs(tenant_id, position)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_songs_tenant_active ON songs(tenant_id, active)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create an in-memory database with the full schema (test helper)
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}
