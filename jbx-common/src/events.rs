//! Event types for the jukebox event system

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playback state reported by the playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

/// Jukebox event types
///
/// Broadcast over a `tokio::sync::broadcast` channel; every subscriber
/// (display refresher, logging, tests) receives its own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback state changed
    PlaybackStateChanged {
        tenant_id: String,
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing
    TrackStarted {
        tenant_id: String,
        song_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track finished (completed = false means skipped or failed)
    TrackFinished {
        tenant_id: String,
        song_id: Uuid,
        completed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed (notification only - no data)
    QueueChanged {
        tenant_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Tenant session torn down; all per-tenant state released
    SessionDestroyed {
        tenant_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Tenant this event belongs to
    pub fn tenant_id(&self) -> &str {
        match self {
            PlayerEvent::PlaybackStateChanged { tenant_id, .. }
            | PlayerEvent::TrackStarted { tenant_id, .. }
            | PlayerEvent::TrackFinished { tenant_id, .. }
            | PlayerEvent::QueueChanged { tenant_id, .. }
            | PlayerEvent::SessionDestroyed { tenant_id, .. } => tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tags_type() {
        let event = PlayerEvent::QueueChanged {
            tenant_id: "g1".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"QueueChanged\""));
        assert!(json.contains("\"tenant_id\":\"g1\""));
    }

    #[test]
    fn test_tenant_id_accessor() {
        let event = PlayerEvent::SessionDestroyed {
            tenant_id: "g2".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(event.tenant_id(), "g2");
    }
}
