//! Playback components
//!
//! The controller drives one external audio resource per tenant through a
//! small state machine; the `AudioSink` trait is the boundary to the actual
//! audio transport.

pub mod controller;

pub use controller::{PlaybackController, Trigger, MAX_CONSECUTIVE_RETRIES};

use crate::error::Result;
use async_trait::async_trait;

/// Completion signals emitted by an audio sink
///
/// Delivered over an mpsc channel owned by the tenant session; the session
/// feeds them back into [`PlaybackController::handle_signal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// Playback ended without error
    Finished,
    /// The current track is unplayable
    Failed(String),
    /// Sink lost (e.g. voice disconnect); no retry
    Unsubscribed,
}

/// Per-tenant audio resource
///
/// Implementations resolve the locator to a streamable resource, attach it
/// to the tenant's audio output, and emit [`PlaybackSignal`]s on the channel
/// they were constructed with.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Start playing `locator` from `start_at_secs`. An error return means
    /// the track failed immediately.
    async fn play(&self, locator: &str, start_at_secs: u64) -> Result<()>;

    /// Stop the current resource deterministically (no Finished signal)
    async fn stop(&self);

    /// Pause without releasing the resource
    async fn pause(&self);

    /// Resume after pause
    async fn resume(&self);

    /// Release the underlying resource entirely
    async fn release(&self);
}
