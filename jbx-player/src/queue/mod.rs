//! Song queue component
//!
//! **Responsibilities:**
//! - Ordered, persisted song collection per tenant
//! - Position/active-flag invariants (unique, strictly increasing positions
//!   among active songs; head = minimum-position active song)
//! - Soft delete with bounded retention for "previous" undo
//! - Loop / loop-queue repositioning arithmetic
//! - Pagination offset clamping and option-flag pruning
//!
//! Persistence lives in [`store`]; this module composes the store calls into
//! the queue operations. All mutations for one tenant are serialized upstream
//! (see `serializer`), so store calls need no additional locking.

pub mod store;

use crate::error::{Error, Result};
use crate::resolver::Track;
use jbx_common::db::{QueueOption, SongRow};
use jbx_common::human_time::format_duration;
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Hard cap on active songs per tenant
pub const MAX_ACTIVE_SONGS: i64 = 10_000;

/// Default page size for the queue display
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// How long inactive songs are retained for "previous" undo
pub const INACTIVE_RETENTION: std::time::Duration = std::time::Duration::from_secs(3600);

/// Outcome of an append operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// All songs were appended
    Appended(usize),
    /// Nothing was appended; the active-song cap would be exceeded
    CapacityExceeded,
}

/// Persisted, ordered song queue for one tenant
pub struct SongQueue {
    db: SqlitePool,
    tenant_id: String,
    owner_id: String,
    page_offset: i64,
    options: Vec<QueueOption>,
    channel_ref: Option<String>,
    message_ref: Option<String>,
    thread_ref: Option<String>,
}

impl SongQueue {
    /// Load the tenant's queue, creating the row on first use
    pub async fn load(db: SqlitePool, tenant_id: &str, owner_id: &str) -> Result<Self> {
        let row = match store::get_queue_row(&db, tenant_id).await? {
            Some(row) => row,
            None => {
                info!("Creating queue for tenant {}", tenant_id);
                store::insert_queue_row(&db, tenant_id, owner_id).await?;
                store::get_queue_row(&db, tenant_id).await?.ok_or_else(|| {
                    Error::Internal("queue row missing after insert".to_string())
                })?
            }
        };

        let options: Vec<QueueOption> = serde_json::from_str(&row.options)?;

        Ok(Self {
            db,
            tenant_id: row.tenant_id,
            owner_id: row.owner_id,
            page_offset: row.page_offset,
            options,
            channel_ref: row.channel_ref,
            message_ref: row.message_ref,
            thread_ref: row.thread_ref,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn message_ref(&self) -> Option<&str> {
        self.message_ref.as_deref()
    }

    pub fn page_offset(&self) -> i64 {
        self.page_offset
    }

    /// Record the external display references
    pub async fn set_display_refs(
        &mut self,
        channel_ref: Option<String>,
        message_ref: Option<String>,
        thread_ref: Option<String>,
    ) -> Result<()> {
        self.channel_ref = channel_ref;
        self.message_ref = message_ref;
        self.thread_ref = thread_ref;
        store::update_queue_refs(
            &self.db,
            &self.tenant_id,
            self.channel_ref.as_deref(),
            self.message_ref.as_deref(),
            self.thread_ref.as_deref(),
        )
        .await
    }

    // ---- option flags ----

    pub fn has_option(&self, option: QueueOption) -> bool {
        self.options.contains(&option)
    }

    /// Set an option flag (no-op if already set)
    pub async fn set_option(&mut self, option: QueueOption) -> Result<()> {
        if !self.options.contains(&option) {
            self.options.push(option);
            self.persist_options().await?;
        }
        Ok(())
    }

    /// Clear an option flag (no-op if not set)
    pub async fn clear_option(&mut self, option: QueueOption) -> Result<()> {
        let before = self.options.len();
        self.options.retain(|o| *o != option);
        if self.options.len() != before {
            self.persist_options().await?;
        }
        Ok(())
    }

    /// Toggle an option flag; returns the new state
    pub async fn toggle_option(&mut self, option: QueueOption) -> Result<bool> {
        if self.has_option(option) {
            self.clear_option(option).await?;
            Ok(false)
        } else {
            self.set_option(option).await?;
            Ok(true)
        }
    }

    async fn persist_options(&self) -> Result<()> {
        let json = serde_json::to_string(&self.options)?;
        store::update_queue_options(&self.db, &self.tenant_id, &json).await
    }

    // ---- queries ----

    /// The active song with the smallest position, if any
    pub async fn head(&self) -> Result<Option<SongRow>> {
        Ok(store::first_active(&self.db, &self.tenant_id, 1)
            .await?
            .into_iter()
            .next())
    }

    /// Number of active songs
    pub async fn active_len(&self) -> Result<i64> {
        store::active_count(&self.db, &self.tenant_id).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.active_len().await? == 0)
    }

    /// Active songs at `[offset, offset + page_size)`, head excluded
    pub async fn paginate(&self, offset: i64, page_size: i64) -> Result<Vec<SongRow>> {
        store::page_active(&self.db, &self.tenant_id, offset, page_size).await
    }

    /// The current display page at the stored offset
    pub async fn current_page(&self, page_size: i64) -> Result<Vec<SongRow>> {
        self.paginate(self.page_offset, page_size).await
    }

    // ---- mutations ----

    /// Append a resolver batch, preserving batch order.
    ///
    /// New songs land after the current maximum position, or (for
    /// `to_front`) in the gap `[min - batch, min)` so they precede the
    /// existing songs without touching them. Returns `CapacityExceeded`
    /// instead of inserting when the cap would be crossed.
    pub async fn append_songs(&mut self, tracks: &[Track], to_front: bool) -> Result<AppendOutcome> {
        if tracks.is_empty() {
            return Ok(AppendOutcome::Appended(0));
        }

        let count = store::active_count(&self.db, &self.tenant_id).await?;
        if count + tracks.len() as i64 > MAX_ACTIVE_SONGS {
            debug!(
                "Capacity exceeded for tenant {}: {} active + {} new",
                self.tenant_id,
                count,
                tracks.len()
            );
            return Ok(AppendOutcome::CapacityExceeded);
        }

        let bounds = store::active_position_bounds(&self.db, &self.tenant_id).await?;
        let start = match (bounds, to_front) {
            (None, _) => 0,
            (Some((min, _)), true) => min - tracks.len() as i64,
            (Some((_, max)), false) => max + 1,
        };

        let now = chrono::Utc::now().to_rfc3339();
        let rows: Vec<SongRow> = tracks
            .iter()
            .enumerate()
            .map(|(i, track)| SongRow {
                guid: Uuid::new_v4().to_string(),
                tenant_id: self.tenant_id.clone(),
                position: start + i as i64,
                added_at: now.clone(),
                locator: track.locator.clone(),
                name: track.name.clone(),
                short_name: track.short_name.clone(),
                duration_secs: track.duration_secs,
                duration_display: format_duration(track.duration_secs),
                active: true,
            })
            .collect();

        store::insert_songs(&self.db, &rows).await?;
        info!(
            "Appended {} songs to tenant {} ({})",
            rows.len(),
            self.tenant_id,
            if to_front { "front" } else { "back" }
        );

        Ok(AppendOutcome::Appended(rows.len()))
    }

    /// Pop up to `n` leading active songs.
    ///
    /// With `LoopQueue` set the popped songs stay active and move behind the
    /// current maximum (shift by `max - min + 1`, keeping relative order).
    /// Otherwise they are deactivated with positions descending below the
    /// current minimum inactive position, so inactive songs stay ordered
    /// most-recently-played-first. Returns the popped songs.
    pub async fn advance_head(&mut self, n: i64) -> Result<Vec<SongRow>> {
        if n <= 0 {
            return Ok(Vec::new());
        }

        let popped = store::first_active(&self.db, &self.tenant_id, n).await?;
        if popped.is_empty() {
            return Ok(popped);
        }

        if self.has_option(QueueOption::LoopQueue) {
            // Move to the back, order preserved
            if let Some((min, max)) =
                store::active_position_bounds(&self.db, &self.tenant_id).await?
            {
                let shift = max - min + 1;
                for song in &popped {
                    store::set_position(&self.db, &song.guid, song.position + shift).await?;
                }
            }
        } else {
            let floor = store::min_inactive_position(&self.db, &self.tenant_id)
                .await?
                .unwrap_or(0);
            let now = chrono::Utc::now().to_rfc3339();
            // Later pops get smaller positions: most recent first among inactive
            for (i, song) in popped.iter().enumerate() {
                store::deactivate_song(&self.db, &song.guid, floor - 1 - i as i64, &now).await?;
            }
        }

        self.revalidate(DEFAULT_PAGE_SIZE).await?;
        Ok(popped)
    }

    /// Restore the most recently deactivated song as the new head
    pub async fn previous_song(&mut self) -> Result<Option<SongRow>> {
        let song = match store::most_recent_inactive(&self.db, &self.tenant_id).await? {
            Some(song) => song,
            None => return Ok(None),
        };

        let position = match self.head().await? {
            Some(head) => head.position - 1,
            None => 0,
        };

        store::activate_song(&self.db, &song.guid, position).await?;
        self.revalidate(DEFAULT_PAGE_SIZE).await?;

        Ok(Some(SongRow {
            position,
            active: true,
            ..song
        }))
    }

    /// Delete a song outright (unplayable track path)
    pub async fn remove_song(&mut self, guid: &str) -> Result<()> {
        store::delete_song(&self.db, guid).await?;
        self.revalidate(DEFAULT_PAGE_SIZE).await
    }

    /// Delete active songs by their indices into the non-head ordering
    ///
    /// Out-of-range indices are ignored; returns the number removed.
    pub async fn remove_by_indices(&mut self, indices: &[usize]) -> Result<u64> {
        if indices.is_empty() {
            return Ok(0);
        }

        let mut songs = store::active_songs(&self.db, &self.tenant_id).await?;
        if songs.len() <= 1 {
            return Ok(0);
        }
        songs.remove(0); // head is not addressable by index

        let guids: Vec<String> = indices
            .iter()
            .filter_map(|&i| songs.get(i).map(|s| s.guid.clone()))
            .collect();

        let removed = store::delete_songs(&self.db, &guids).await?;
        if removed > 0 {
            self.revalidate(DEFAULT_PAGE_SIZE).await?;
        }

        Ok(removed)
    }

    /// Shuffle the non-head active songs via a randomized permutation of
    /// their existing positions (the playing head never moves)
    pub async fn shuffle_active(&mut self) -> Result<()> {
        let mut songs = store::active_songs(&self.db, &self.tenant_id).await?;
        if songs.len() <= 2 {
            return Ok(());
        }
        songs.remove(0);

        let mut positions: Vec<i64> = songs.iter().map(|s| s.position).collect();
        positions.shuffle(&mut rand::thread_rng());

        for (song, position) in songs.iter().zip(positions) {
            if song.position != position {
                store::set_position(&self.db, &song.guid, position).await?;
            }
        }

        debug!("Shuffled {} songs for tenant {}", songs.len(), self.tenant_id);
        Ok(())
    }

    /// Delete every song; the queue row itself survives
    pub async fn clear(&mut self) -> Result<()> {
        store::clear_songs(&self.db, &self.tenant_id).await?;
        self.revalidate(DEFAULT_PAGE_SIZE).await
    }

    /// Delete the queue row and all songs (session teardown)
    pub async fn destroy(&mut self) -> Result<()> {
        store::delete_queue(&self.db, &self.tenant_id).await?;
        info!("Destroyed queue for tenant {}", self.tenant_id);
        Ok(())
    }

    // ---- invariant maintenance ----

    /// Move the pagination cursor, clamped to valid page starts
    pub async fn set_page_offset(&mut self, offset: i64, page_size: i64) -> Result<()> {
        self.page_offset = offset.max(0);
        self.clamp_offset(page_size).await
    }

    /// Re-clamp the offset to `[0, size)` in page-size multiples
    pub async fn clamp_offset(&mut self, page_size: i64) -> Result<()> {
        let size = (store::active_count(&self.db, &self.tenant_id).await? - 1).max(0);

        let clamped = if size == 0 {
            0
        } else {
            let max_start = ((size - 1) / page_size) * page_size;
            (self.page_offset.min(max_start) / page_size) * page_size
        };

        if clamped != self.page_offset {
            self.page_offset = clamped;
            store::update_queue_offset(&self.db, &self.tenant_id, clamped).await?;
        }
        Ok(())
    }

    /// Clear option flags that are invalid at the current queue size
    pub async fn prune_options(&mut self) -> Result<()> {
        let active = store::active_count(&self.db, &self.tenant_id).await?;
        let non_head = (active - 1).max(0);

        let before = self.options.len();
        self.options.retain(|o| match o {
            QueueOption::RemoveSelected
            | QueueOption::ForwardSelected
            | QueueOption::TranslateSelected => non_head >= 2,
            QueueOption::LoopQueue => active >= 3,
            QueueOption::Expanded => active >= 2,
            _ => true,
        });

        if self.options.len() != before {
            debug!(
                "Pruned {} option flags for tenant {}",
                before - self.options.len(),
                self.tenant_id
            );
            self.persist_options().await?;
        }
        Ok(())
    }

    /// Offset and flags must be revisited after every size-changing mutation
    async fn revalidate(&mut self, page_size: i64) -> Result<()> {
        self.clamp_offset(page_size).await?;
        self.prune_options().await
    }

    /// Purge inactive songs past the retention window, across all tenants
    ///
    /// Run periodically from a background task.
    pub async fn sweep_inactive(db: &SqlitePool, retention: std::time::Duration) -> Result<u64> {
        let retention =
            chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        let cutoff = (chrono::Utc::now() - retention).to_rfc3339();
        let purged = store::delete_expired_inactive(db, &cutoff).await?;
        if purged > 0 {
            info!("Swept {} expired inactive songs", purged);
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbx_common::db::init_memory_database;

    fn track(name: &str) -> Track {
        Track {
            name: name.to_string(),
            short_name: None,
            locator: format!("source://{}", name),
            duration_secs: 180,
        }
    }

    async fn queue_with(names: &[&str]) -> SongQueue {
        let db = init_memory_database().await.unwrap();
        let mut queue = SongQueue::load(db, "tenant-1", "owner-1").await.unwrap();
        let tracks: Vec<Track> = names.iter().map(|n| track(n)).collect();
        queue.append_songs(&tracks, false).await.unwrap();
        queue
    }

    async fn active_names(queue: &SongQueue) -> Vec<String> {
        store::active_songs(&queue.db, &queue.tenant_id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect()
    }

    #[tokio::test]
    async fn test_positions_unique_and_increasing() {
        let queue = queue_with(&["a", "b", "c"]).await;
        let songs = store::active_songs(&queue.db, &queue.tenant_id).await.unwrap();
        for pair in songs.windows(2) {
            assert!(pair[0].position < pair[1].position);
        }
        assert_eq!(queue.head().await.unwrap().unwrap().name, "a");
    }

    #[tokio::test]
    async fn test_append_to_front_preserves_batch_order() {
        let mut queue = queue_with(&["c", "d"]).await;
        queue
            .append_songs(&[track("a"), track("b")], true)
            .await
            .unwrap();
        assert_eq!(active_names(&queue).await, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_append_respects_capacity() {
        let db = init_memory_database().await.unwrap();
        let mut queue = SongQueue::load(db, "t", "o").await.unwrap();
        let batch: Vec<Track> = (0..MAX_ACTIVE_SONGS).map(|i| track(&i.to_string())).collect();
        assert_eq!(
            queue.append_songs(&batch, false).await.unwrap(),
            AppendOutcome::Appended(MAX_ACTIVE_SONGS as usize)
        );
        assert_eq!(
            queue.append_songs(&[track("over")], false).await.unwrap(),
            AppendOutcome::CapacityExceeded
        );
        assert_eq!(queue.active_len().await.unwrap(), MAX_ACTIVE_SONGS);
    }

    #[tokio::test]
    async fn test_advance_without_loop_deactivates() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        let popped = queue.advance_head(1).await.unwrap();
        assert_eq!(popped.len(), 1);
        assert_eq!(popped[0].name, "a");

        assert_eq!(queue.head().await.unwrap().unwrap().name, "b");
        assert_eq!(queue.active_len().await.unwrap(), 2);

        // a is retained inactive for undo
        let inactive = store::most_recent_inactive(&queue.db, &queue.tenant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inactive.name, "a");
    }

    #[tokio::test]
    async fn test_advance_orders_inactive_most_recent_first() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.advance_head(1).await.unwrap(); // a inactive
        queue.advance_head(1).await.unwrap(); // b inactive

        // b played more recently, so it must sort before a
        let most_recent = store::most_recent_inactive(&queue.db, &queue.tenant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(most_recent.name, "b");
    }

    #[tokio::test]
    async fn test_advance_with_loop_queue_moves_to_back() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.set_option(QueueOption::LoopQueue).await.unwrap();

        let prior_max = store::active_position_bounds(&queue.db, &queue.tenant_id)
            .await
            .unwrap()
            .unwrap()
            .1;
        queue.advance_head(1).await.unwrap();

        // size unchanged, a still active behind the prior maximum
        assert_eq!(queue.active_len().await.unwrap(), 3);
        assert_eq!(queue.head().await.unwrap().unwrap().name, "b");
        assert_eq!(active_names(&queue).await, vec!["b", "c", "a"]);

        let songs = store::active_songs(&queue.db, &queue.tenant_id).await.unwrap();
        let a = songs.iter().find(|s| s.name == "a").unwrap();
        assert!(a.position > prior_max);
    }

    #[tokio::test]
    async fn test_advance_beyond_size_stops_at_edge() {
        let mut queue = queue_with(&["a", "b"]).await;
        let popped = queue.advance_head(10).await.unwrap();
        assert_eq!(popped.len(), 2);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_advance_on_empty_queue_is_noop() {
        let db = init_memory_database().await.unwrap();
        let mut queue = SongQueue::load(db, "t", "o").await.unwrap();
        assert!(queue.advance_head(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_previous_restores_prior_head() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.advance_head(1).await.unwrap();
        assert_eq!(queue.head().await.unwrap().unwrap().name, "b");

        let restored = queue.previous_song().await.unwrap().unwrap();
        assert_eq!(restored.name, "a");

        let head = queue.head().await.unwrap().unwrap();
        assert_eq!(head.name, "a");

        let songs = store::active_songs(&queue.db, &queue.tenant_id).await.unwrap();
        let b = songs.iter().find(|s| s.name == "b").unwrap();
        assert!(head.position < b.position);
    }

    #[tokio::test]
    async fn test_previous_with_no_inactive_returns_none() {
        let mut queue = queue_with(&["a"]).await;
        assert!(queue.previous_song().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_by_indices_skips_head() {
        let mut queue = queue_with(&["a", "b", "c", "d"]).await;
        // indices are relative to the non-head ordering: 0 = b, 2 = d
        let removed = queue.remove_by_indices(&[0, 2]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(active_names(&queue).await, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_remove_by_indices_ignores_out_of_range() {
        let mut queue = queue_with(&["a", "b"]).await;
        let removed = queue.remove_by_indices(&[5]).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(queue.active_len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_shuffle_preserves_set_and_head() {
        let names: Vec<String> = (0..20).map(|i| format!("s{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut queue = queue_with(&refs).await;

        queue.shuffle_active().await.unwrap();

        let after = active_names(&queue).await;
        assert_eq!(after[0], "s0"); // head unmoved
        let mut sorted = after.clone();
        sorted.sort();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(sorted, expected);

        // invariant: still strictly increasing
        let songs = store::active_songs(&queue.db, &queue.tenant_id).await.unwrap();
        for pair in songs.windows(2) {
            assert!(pair[0].position < pair[1].position);
        }
    }

    #[tokio::test]
    async fn test_paginate_excludes_head() {
        let queue = queue_with(&["a", "b", "c", "d", "e"]).await;
        let page = queue.paginate(0, 3).await.unwrap();
        let names: Vec<&str> = page.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d"]);

        let page2 = queue.paginate(3, 3).await.unwrap();
        let names2: Vec<&str> = page2.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names2, vec!["e"]);
    }

    #[tokio::test]
    async fn test_offset_reclamped_when_size_shrinks() {
        let names: Vec<String> = (0..25).map(|i| format!("s{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut queue = queue_with(&refs).await;

        queue.set_page_offset(20, DEFAULT_PAGE_SIZE).await.unwrap();
        assert_eq!(queue.page_offset(), 20);

        // Shrink below the cursor: 24 non-head songs -> remove 20 of them
        let indices: Vec<usize> = (4..24).collect();
        queue.remove_by_indices(&indices).await.unwrap();

        // 4 non-head songs left: only valid page start is 0
        assert_eq!(queue.page_offset(), 0);
    }

    #[tokio::test]
    async fn test_option_flags_pruned_when_queue_shrinks() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.set_option(QueueOption::LoopQueue).await.unwrap();
        queue.set_option(QueueOption::RemoveSelected).await.unwrap();

        queue.advance_head(1).await.unwrap();
        // 3 active still (loop queue), flags survive
        assert!(queue.has_option(QueueOption::LoopQueue));

        queue.clear_option(QueueOption::LoopQueue).await.unwrap();
        queue.advance_head(1).await.unwrap();
        // 2 active, 1 non-head: RemoveSelected requires 2 non-head
        assert!(!queue.has_option(QueueOption::RemoveSelected));
    }

    #[tokio::test]
    async fn test_options_survive_reload() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.set_option(QueueOption::Loop).await.unwrap();
        let db = queue.db.clone();
        drop(queue);

        let reloaded = SongQueue::load(db, "tenant-1", "owner-1").await.unwrap();
        assert!(reloaded.has_option(QueueOption::Loop));
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.advance_head(1).await.unwrap();
        queue.clear().await.unwrap();
        assert!(queue.is_empty().await.unwrap());
        assert!(
            store::most_recent_inactive(&queue.db, &queue.tenant_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sweep_purges_only_expired_inactive() {
        let mut queue = queue_with(&["a", "b", "c"]).await;
        queue.advance_head(1).await.unwrap();

        // Nothing is older than an hour yet
        let db = queue.db.clone();
        assert_eq!(
            SongQueue::sweep_inactive(&db, INACTIVE_RETENTION).await.unwrap(),
            0
        );

        // With zero retention the inactive song goes; active songs stay
        assert_eq!(
            SongQueue::sweep_inactive(&db, std::time::Duration::ZERO)
                .await
                .unwrap(),
            1
        );
        assert_eq!(queue.active_len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_scenario_advance_then_previous() {
        // enqueue A,B,C -> head=A; advance -> head=B; previous -> head=A
        let mut queue = queue_with(&["A", "B", "C"]).await;
        assert_eq!(queue.head().await.unwrap().unwrap().name, "A");

        queue.advance_head(1).await.unwrap();
        assert_eq!(queue.head().await.unwrap().unwrap().name, "B");

        queue.previous_song().await.unwrap();
        let head = queue.head().await.unwrap().unwrap();
        assert_eq!(head.name, "A");

        let songs = store::active_songs(&queue.db, &queue.tenant_id).await.unwrap();
        let b = songs.iter().find(|s| s.name == "B").unwrap();
        assert!(head.position < b.position);
    }
}
