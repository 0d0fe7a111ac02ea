//! Song queue database operations
//!
//! Raw SQL for the `queues` and `songs` tables. One function per statement;
//! the `SongQueue` component in the parent module composes these into the
//! queue operations.

use crate::error::{Error, Result};
use jbx_common::db::{QueueRow, SongRow};
use sqlx::SqlitePool;

const SONG_COLUMNS: &str = "guid, tenant_id, position, added_at, locator, name, \
                            short_name, duration_secs, duration_display, active";

/// Fetch the queue row for a tenant, if one exists
pub async fn get_queue_row(db: &SqlitePool, tenant_id: &str) -> Result<Option<QueueRow>> {
    let row = sqlx::query_as::<_, QueueRow>(
        r#"
        SELECT tenant_id, owner_id, channel_ref, message_ref, thread_ref,
               page_offset, options
        FROM queues
        WHERE tenant_id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Insert a fresh queue row (first playback request for this tenant)
pub async fn insert_queue_row(db: &SqlitePool, tenant_id: &str, owner_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO queues (tenant_id, owner_id, page_offset, options)
        VALUES (?, ?, 0, '[]')
        "#,
    )
    .bind(tenant_id)
    .bind(owner_id)
    .execute(db)
    .await?;

    Ok(())
}

/// Update the pagination offset
pub async fn update_queue_offset(db: &SqlitePool, tenant_id: &str, offset: i64) -> Result<()> {
    sqlx::query("UPDATE queues SET page_offset = ? WHERE tenant_id = ?")
        .bind(offset)
        .bind(tenant_id)
        .execute(db)
        .await?;

    Ok(())
}

/// Update the persisted option flags (JSON array)
pub async fn update_queue_options(db: &SqlitePool, tenant_id: &str, options: &str) -> Result<()> {
    sqlx::query("UPDATE queues SET options = ? WHERE tenant_id = ?")
        .bind(options)
        .bind(tenant_id)
        .execute(db)
        .await?;

    Ok(())
}

/// Update the external display references
pub async fn update_queue_refs(
    db: &SqlitePool,
    tenant_id: &str,
    channel_ref: Option<&str>,
    message_ref: Option<&str>,
    thread_ref: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE queues SET channel_ref = ?, message_ref = ?, thread_ref = ? WHERE tenant_id = ?",
    )
    .bind(channel_ref)
    .bind(message_ref)
    .bind(thread_ref)
    .bind(tenant_id)
    .execute(db)
    .await?;

    Ok(())
}

/// Delete the queue row and every song it owns
pub async fn delete_queue(db: &SqlitePool, tenant_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM songs WHERE tenant_id = ?")
        .bind(tenant_id)
        .execute(db)
        .await?;

    sqlx::query("DELETE FROM queues WHERE tenant_id = ?")
        .bind(tenant_id)
        .execute(db)
        .await?;

    Ok(())
}

/// Rows per multi-row INSERT; keeps bind counts well under SQLite's
/// variable limit
const INSERT_CHUNK: usize = 500;

/// Insert a batch of songs as one positioning pass
///
/// Chunked multi-row INSERTs inside a single transaction, so a resolver
/// batch is applied atomically.
pub async fn insert_songs(db: &SqlitePool, rows: &[SongRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = db.begin().await?;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut builder = sqlx::QueryBuilder::new(
            "INSERT INTO songs (guid, tenant_id, position, added_at, locator, name, \
             short_name, duration_secs, duration_display, active) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(&row.guid)
                .push_bind(&row.tenant_id)
                .push_bind(row.position)
                .push_bind(&row.added_at)
                .push_bind(&row.locator)
                .push_bind(&row.name)
                .push_bind(&row.short_name)
                .push_bind(row.duration_secs)
                .push_bind(&row.duration_display)
                .push_bind(row.active);
        });
        builder.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    Ok(())
}

/// All active songs ordered by position
pub async fn active_songs(db: &SqlitePool, tenant_id: &str) -> Result<Vec<SongRow>> {
    let rows = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs \
         WHERE tenant_id = ? AND active = 1 ORDER BY position ASC",
    ))
    .bind(tenant_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// First `limit` active songs by position (index 0 is the head)
pub async fn first_active(db: &SqlitePool, tenant_id: &str, limit: i64) -> Result<Vec<SongRow>> {
    let rows = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs \
         WHERE tenant_id = ? AND active = 1 ORDER BY position ASC LIMIT ?",
    ))
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Active songs at `[offset, offset + limit)` excluding the head
pub async fn page_active(
    db: &SqlitePool,
    tenant_id: &str,
    offset: i64,
    limit: i64,
) -> Result<Vec<SongRow>> {
    let rows = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs \
         WHERE tenant_id = ? AND active = 1 ORDER BY position ASC LIMIT ? OFFSET ?",
    ))
    .bind(tenant_id)
    .bind(limit)
    .bind(offset + 1) // skip the head
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Number of active songs
pub async fn active_count(db: &SqlitePool, tenant_id: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE tenant_id = ? AND active = 1")
            .bind(tenant_id)
            .fetch_one(db)
            .await?;

    Ok(count)
}

/// Minimum and maximum active position, or None if no active songs
pub async fn active_position_bounds(
    db: &SqlitePool,
    tenant_id: &str,
) -> Result<Option<(i64, i64)>> {
    let row: (Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT MIN(position), MAX(position) FROM songs WHERE tenant_id = ? AND active = 1",
    )
    .bind(tenant_id)
    .fetch_one(db)
    .await?;

    Ok(match row {
        (Some(min), Some(max)) => Some((min, max)),
        _ => None,
    })
}

/// Minimum position among inactive songs (most recently played)
pub async fn min_inactive_position(db: &SqlitePool, tenant_id: &str) -> Result<Option<i64>> {
    let min: Option<i64> =
        sqlx::query_scalar("SELECT MIN(position) FROM songs WHERE tenant_id = ? AND active = 0")
            .bind(tenant_id)
            .fetch_one(db)
            .await?;

    Ok(min)
}

/// The most recently deactivated song, if any
pub async fn most_recent_inactive(db: &SqlitePool, tenant_id: &str) -> Result<Option<SongRow>> {
    let row = sqlx::query_as::<_, SongRow>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs \
         WHERE tenant_id = ? AND active = 0 ORDER BY position ASC LIMIT 1",
    ))
    .bind(tenant_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Move a song to a new position
pub async fn set_position(db: &SqlitePool, guid: &str, position: i64) -> Result<()> {
    sqlx::query("UPDATE songs SET position = ? WHERE guid = ?")
        .bind(position)
        .bind(guid)
        .execute(db)
        .await?;

    Ok(())
}

/// Deactivate a song, repositioning it and re-stamping its timestamp
pub async fn deactivate_song(
    db: &SqlitePool,
    guid: &str,
    position: i64,
    added_at: &str,
) -> Result<()> {
    sqlx::query("UPDATE songs SET active = 0, position = ?, added_at = ? WHERE guid = ?")
        .bind(position)
        .bind(added_at)
        .bind(guid)
        .execute(db)
        .await?;

    Ok(())
}

/// Reactivate a song at the given position
pub async fn activate_song(db: &SqlitePool, guid: &str, position: i64) -> Result<()> {
    sqlx::query("UPDATE songs SET active = 1, position = ? WHERE guid = ?")
        .bind(position)
        .bind(guid)
        .execute(db)
        .await?;

    Ok(())
}

/// Delete a single song outright
pub async fn delete_song(db: &SqlitePool, guid: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM songs WHERE guid = ?")
        .bind(guid)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Song not found: {}", guid)));
    }

    Ok(())
}

/// Delete a set of songs by guid; returns the number removed
pub async fn delete_songs(db: &SqlitePool, guids: &[String]) -> Result<u64> {
    let mut removed = 0u64;
    for guid in guids {
        let result = sqlx::query("DELETE FROM songs WHERE guid = ?")
            .bind(guid)
            .execute(db)
            .await?;
        removed += result.rows_affected();
    }

    Ok(removed)
}

/// Delete every song (active and inactive) belonging to a tenant
pub async fn clear_songs(db: &SqlitePool, tenant_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM songs WHERE tenant_id = ?")
        .bind(tenant_id)
        .execute(db)
        .await?;

    Ok(())
}

/// Purge inactive songs whose retention window has expired
///
/// `cutoff` is an RFC3339 timestamp; UTC RFC3339 strings compare
/// chronologically, so a lexicographic comparison is sufficient.
pub async fn delete_expired_inactive(db: &SqlitePool, cutoff: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM songs WHERE active = 0 AND added_at < ?")
        .bind(cutoff)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}
