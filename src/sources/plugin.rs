use async_trait::async_trait;

use crate::protocol::Track;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("query is empty")]
    EmptyQuery,
    #[error("no matches found for {0:?}")]
    NoMatches(String),
    #[error("unsupported source: {0}")]
    Unsupported(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("i/o error: {0}")]
    Io(String),
}

/// Turns whatever the user typed into one playable [`Track`].
///
/// Implementations may take arbitrarily long; callers must not hold a
/// session lock across `resolve`.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError>;
}

/// Trait that all source plugins must implement.
///
/// The [`SourceManager`](super::SourceManager) asks each registered plugin in
/// order whether it can handle an identifier, and lets the first taker
/// resolve it.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique identifier for this source (e.g. "http", "local").
    fn name(&self) -> &str;

    /// Check if this source can handle the given identifier.
    ///
    /// - HTTP source: `http://`, `https://` and `icy://` URLs
    /// - Local source: `file://` URLs, absolute paths and `localsearch:`
    fn can_handle(&self, identifier: &str) -> bool;

    async fn resolve(&self, identifier: &str) -> Result<Track, ResolveError>;
}

pub type BoxedSource = Box<dyn SourcePlugin>;
