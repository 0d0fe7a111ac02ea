//! Database models

use serde::{Deserialize, Serialize};

/// Mode flags persisted in the `queues.options` JSON array
///
/// Mutually exclusive subsets are enforced by component logic, not storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueOption {
    /// Queue display is in edit mode
    Editing,
    /// Expanded (multi-page) display
    Expanded,
    /// Repeat the current head indefinitely without advancing
    Loop,
    /// Advance normally but re-append played songs to the tail
    LoopQueue,
    /// Clear control armed, waiting for confirmation
    ClearSelected,
    /// Stop control armed, waiting for confirmation
    StopSelected,
    /// Removal selection in progress
    RemoveSelected,
    /// Forward (move-to-front) selection in progress
    ForwardSelected,
    /// Translation selection in progress
    TranslateSelected,
}

/// One row of the `queues` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueueRow {
    pub tenant_id: String,
    pub owner_id: String,
    pub channel_ref: Option<String>,
    pub message_ref: Option<String>,
    pub thread_ref: Option<String>,
    pub page_offset: i64,
    /// JSON array of option flag names
    pub options: String,
}

/// One row of the `songs` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SongRow {
    pub guid: String,
    pub tenant_id: String,
    pub position: i64,
    /// RFC3339; re-stamped when the song is deactivated
    pub added_at: String,
    pub locator: String,
    pub name: String,
    pub short_name: Option<String>,
    pub duration_secs: i64,
    pub duration_display: String,
    pub active: bool,
}
