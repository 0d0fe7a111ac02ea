//! Common error types for the jukebox workspace

use thiserror::Error;

/// Common result type for jukebox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the shared library code
///
/// Service-level concerns (playback, resolution, display writes) carry their
/// own enum in `jbx-player`; this one covers only what the common crate
/// itself can fail at.
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection, schema, or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error while creating or opening the database
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or path resolution error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("no config file found".to_string());
        assert_eq!(err.to_string(), "Configuration error: no config file found");
    }
}
