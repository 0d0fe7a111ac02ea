//! Playback controller
//!
//! **Responsibilities:**
//! - State machine: Idle -> Buffering -> Playing <-> Paused -> Idle, with an
//!   error path back to Idle
//! - Guarded play (no duplicate subscriptions), elapsed-time tracking
//! - Advance-with-retry on completion/failure, bounded at 5 consecutive
//!   failed plays, then silent stall until the next external trigger
//! - User triggers: skip, replay, previous, jump forward/backward
//! - Idempotent teardown (`kill`) releasing the audio resource on every
//!   exit path

use super::{AudioSink, PlaybackSignal};
use crate::error::{Error, Result};
use crate::queue::SongQueue;
use jbx_common::db::{QueueOption, SongRow};
use jbx_common::events::{PlaybackState, PlayerEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Consecutive failed plays tolerated before the controller stalls
pub const MAX_CONSECUTIVE_RETRIES: u32 = 5;

/// Seconds kept clear of the track end when jumping
const JUMP_END_MARGIN: u64 = 3;

/// User-driven playback controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Advance `n` songs (minimum 1)
    Skip(i64),
    /// Restart the current head from the top
    Replay,
    /// Restore the most recently played song as head
    Previous,
    /// Seek forward by `delta` seconds
    JumpForward(u64),
    /// Seek backward by `delta` seconds
    JumpBackward(u64),
}

/// Drives one external audio resource per tenant
pub struct PlaybackController {
    tenant_id: String,
    sink: Arc<dyn AudioSink>,
    events: broadcast::Sender<PlayerEvent>,
    state: PlaybackState,
    current: Option<SongRow>,
    started_at: Option<Instant>,
    base_offset_secs: u64,
    retries: u32,
}

impl PlaybackController {
    pub fn new(
        tenant_id: &str,
        sink: Arc<dyn AudioSink>,
        events: broadcast::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            sink,
            events,
            state: PlaybackState::Idle,
            current: None,
            started_at: None,
            base_offset_secs: 0,
            retries: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&SongRow> {
        self.current.as_ref()
    }

    /// Seconds of the current track already played
    pub fn elapsed_secs(&self) -> u64 {
        let running = self
            .started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);
        self.base_offset_secs + running
    }

    fn emit(&self, event: PlayerEvent) {
        // Ignore send errors (no subscribers is OK)
        let _ = self.events.send(event);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEvent::PlaybackStateChanged {
                tenant_id: self.tenant_id.clone(),
                state,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Start playing `song`, optionally from a seek offset.
    ///
    /// Guarded: a no-op while Playing or Paused, preventing duplicate
    /// subscriptions on the same sink.
    pub async fn play(&mut self, song: SongRow, start_at_secs: u64) -> Result<()> {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            debug!(
                "Ignoring play for tenant {}: already {:?}",
                self.tenant_id, self.state
            );
            return Ok(());
        }
        self.start(song, start_at_secs).await
    }

    /// Unguarded start; internal transitions reset state first
    async fn start(&mut self, song: SongRow, start_at_secs: u64) -> Result<()> {
        self.set_state(PlaybackState::Buffering);

        if let Err(e) = self.sink.play(&song.locator, start_at_secs).await {
            self.set_state(PlaybackState::Idle);
            self.started_at = None;
            return Err(Error::Playback(format!(
                "Failed to start {}: {}",
                song.name, e
            )));
        }

        info!(
            "Playing '{}' for tenant {} (from {}s)",
            song.name, self.tenant_id, start_at_secs
        );
        self.base_offset_secs = start_at_secs;
        self.started_at = Some(Instant::now());
        self.retries = 0;
        self.emit(PlayerEvent::TrackStarted {
            tenant_id: self.tenant_id.clone(),
            song_id: song_uuid(&song),
            timestamp: chrono::Utc::now(),
        });
        self.current = Some(song);
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Pause playback, freezing the elapsed clock
    pub async fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.base_offset_secs = self.elapsed_secs();
        self.started_at = None;
        self.sink.pause().await;
        self.set_state(PlaybackState::Paused);
    }

    /// Resume a paused track
    pub async fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.sink.resume().await;
        self.started_at = Some(Instant::now());
        self.set_state(PlaybackState::Playing);
    }

    /// Feed a sink completion signal back into the state machine
    pub async fn handle_signal(
        &mut self,
        signal: PlaybackSignal,
        queue: &mut SongQueue,
    ) -> Result<()> {
        match signal {
            PlaybackSignal::Finished => {
                let finished = self.current.take();
                self.started_at = None;
                self.base_offset_secs = 0;
                self.set_state(PlaybackState::Idle);

                if let Some(song) = &finished {
                    self.emit(PlayerEvent::TrackFinished {
                        tenant_id: self.tenant_id.clone(),
                        song_id: song_uuid(song),
                        completed: true,
                        timestamp: chrono::Utc::now(),
                    });
                }

                // Single-song repeat never advances the queue
                if queue.has_option(QueueOption::Loop) {
                    if let Some(song) = finished {
                        return self.start(song, 0).await.or_else(|_| Ok(()));
                    }
                }

                queue.advance_head(1).await?;
                self.advance_and_play(queue).await
            }

            PlaybackSignal::Failed(reason) => {
                warn!(
                    "Playback failed for tenant {}: {}",
                    self.tenant_id, reason
                );
                self.started_at = None;
                self.base_offset_secs = 0;
                self.set_state(PlaybackState::Idle);

                // Unplayable: removed outright, not deactivated
                if let Some(song) = self.current.take() {
                    self.emit(PlayerEvent::TrackFinished {
                        tenant_id: self.tenant_id.clone(),
                        song_id: song_uuid(&song),
                        completed: false,
                        timestamp: chrono::Utc::now(),
                    });
                    if let Err(e) = queue.remove_song(&song.guid).await {
                        debug!("Failed song already gone: {}", e);
                    }
                }
                self.retries += 1;
                self.advance_and_play(queue).await
            }

            PlaybackSignal::Unsubscribed => {
                info!("Sink lost for tenant {}; releasing", self.tenant_id);
                self.started_at = None;
                self.base_offset_secs = 0;
                self.current = None;
                self.sink.release().await;
                self.set_state(PlaybackState::Idle);
                Ok(())
            }
        }
    }

    /// Play the current head, removing unplayable tracks, until either a
    /// play sticks or the retry budget is spent
    async fn advance_and_play(&mut self, queue: &mut SongQueue) -> Result<()> {
        loop {
            if self.retries >= MAX_CONSECUTIVE_RETRIES {
                debug!(
                    "Retry budget spent for tenant {}; stalling until next trigger",
                    self.tenant_id
                );
                self.current = None;
                self.set_state(PlaybackState::Idle);
                return Ok(());
            }

            let head = match queue.head().await? {
                Some(head) => head,
                None => {
                    self.current = None;
                    self.set_state(PlaybackState::Idle);
                    return Ok(());
                }
            };

            match self.start(head.clone(), 0).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Dropping unplayable '{}': {}", head.name, e);
                    self.retries += 1;
                    if let Err(e) = queue.remove_song(&head.guid).await {
                        debug!("Unplayable song already gone: {}", e);
                    }
                }
            }
        }
    }

    /// Apply a user-driven control
    ///
    /// Every trigger stops the current resource deterministically before
    /// re-entering play, and resets the stall budget.
    pub async fn trigger(&mut self, trigger: Trigger, queue: &mut SongQueue) -> Result<()> {
        let elapsed = self.elapsed_secs();
        let current = self.current.clone();

        self.sink.stop().await;
        self.started_at = None;
        self.base_offset_secs = 0;
        self.set_state(PlaybackState::Idle);
        self.retries = 0;

        match trigger {
            Trigger::Skip(n) => {
                if let Some(song) = self.current.take() {
                    self.emit(PlayerEvent::TrackFinished {
                        tenant_id: self.tenant_id.clone(),
                        song_id: song_uuid(&song),
                        completed: false,
                        timestamp: chrono::Utc::now(),
                    });
                }
                queue.advance_head(n.max(1)).await?;
                self.advance_and_play(queue).await
            }

            Trigger::Replay => match current {
                Some(song) => self.start(song, 0).await,
                None => self.advance_and_play(queue).await,
            },

            Trigger::Previous => {
                self.current = None;
                if queue.previous_song().await?.is_none() {
                    debug!("No inactive song to restore for tenant {}", self.tenant_id);
                }
                self.advance_and_play(queue).await
            }

            Trigger::JumpForward(delta) => match current {
                Some(song) => {
                    let target = clamp_seek(elapsed.saturating_add(delta), song.duration_secs);
                    self.start(song, target).await
                }
                None => Ok(()),
            },

            Trigger::JumpBackward(delta) => match current {
                Some(song) => {
                    let target = clamp_seek(elapsed.saturating_sub(delta), song.duration_secs);
                    self.start(song, target).await
                }
                None => Ok(()),
            },
        }
    }

    /// Idempotent teardown: release the resource and clear offsets on every
    /// exit path
    pub async fn kill(&mut self) {
        self.sink.release().await;
        self.current = None;
        self.started_at = None;
        self.base_offset_secs = 0;
        self.retries = 0;
        self.set_state(PlaybackState::Idle);
    }
}

/// Clamp a seek target to `[0, duration - margin]`
fn clamp_seek(target_secs: u64, duration_secs: i64) -> u64 {
    let max = (duration_secs.max(0) as u64).saturating_sub(JUMP_END_MARGIN);
    target_secs.min(max)
}

fn song_uuid(song: &SongRow) -> Uuid {
    Uuid::parse_str(&song.guid).unwrap_or_else(|_| Uuid::nil())
}
