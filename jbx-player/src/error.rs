//! Error types for jbx-player
//!
//! Defines service-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the jbx-player service
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors surfaced by shared library code
    #[error(transparent)]
    Common(#[from] jbx_common::Error),

    /// Persisted state (de)serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Playback state machine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Track resolution errors
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// External display write failed; surfaced only via failure callbacks
    #[error("External write error: {0}")]
    ExternalWrite(String),

    /// Actor is not allowed to act on this tenant
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Queue, song, or referenced message no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the jbx-player Error
pub type Result<T> = std::result::Result<T, Error>;
