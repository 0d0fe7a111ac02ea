//! Song resolution contract
//!
//! Resolving free text or a URL into candidate tracks is an external
//! concern; the core consumes it through this narrow trait.

use crate::error::Result;
use async_trait::async_trait;

/// A candidate track produced by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Display name
    pub name: String,
    /// Optional shortened display variant
    pub short_name: Option<String>,
    /// Opaque source locator, later resolved to a streamable resource
    pub locator: String,
    /// Duration in seconds
    pub duration_secs: i64,
}

/// Resolves a free-text query or URL into zero or more candidate tracks
///
/// `Ok(None)` means the query matched nothing; errors are reserved for the
/// resolution machinery itself failing.
#[async_trait]
pub trait SongResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Option<Vec<Track>>>;
}

/// Resolver that never matches anything; placeholder wiring for a real
/// source adapter
pub struct NullResolver;

#[async_trait]
impl SongResolver for NullResolver {
    async fn resolve(&self, _query: &str) -> Result<Option<Vec<Track>>> {
        Ok(None)
    }
}
