//! # Jukebox Player Library (jbx-player)
//!
//! Per-tenant music playback queue with a concurrency-safe coordination
//! layer.
//!
//! **Purpose:** Keep an ordered, persisted, multi-actor-mutated song queue
//! consistent while a playback state machine advances it, user actions edit
//! it concurrently, and an external display is refreshed without violating
//! rate limits or losing updates.
//!
//! **Architecture:** Every user-triggered action passes through a per-key
//! event serializer; display refreshes funnel through a per-tenant debounced
//! coordinator; sessions are owned by a single manager map.

pub mod commands;
pub mod coordinator;
pub mod error;
pub mod playback;
pub mod queue;
pub mod resolver;
pub mod serializer;
pub mod session;

pub use error::{Error, Result};
pub use session::SessionManager;
