use async_trait::async_trait;
use regex::Regex;

use super::{
    http::HttpSource,
    local::LocalSource,
    plugin::{BoxedSource, ResolveError, TrackResolver},
};
use crate::{configs::SourcesConfig, protocol::Track};

/// Source Manager
pub struct SourceManager {
    pub sources: Vec<BoxedSource>,
    default_search: String,
    scheme: Regex,
}

impl SourceManager {
    /// Create a new SourceManager with every source enabled in `config`.
    pub fn new(config: &SourcesConfig) -> Self {
        let mut sources: Vec<BoxedSource> = Vec::new();

        macro_rules! register_source {
            ($enabled:expr, $name:literal, $ctor:expr) => {
                if $enabled {
                    match $ctor {
                        Ok(src) => {
                            tracing::info!("Loaded source: {}", $name);
                            sources.push(Box::new(src));
                        }
                        Err(e) => {
                            tracing::error!("{} source failed to initialize: {}", $name, e);
                        }
                    }
                }
            };
        }

        register_source!(config.http, "http", HttpSource::new(config.http_probe));
        if config.local {
            tracing::info!("Loaded source: local");
            sources.push(Box::new(LocalSource::new(&config.local_directories)));
        }

        Self::with_sources(sources, &config.default_search)
    }

    pub fn with_sources(sources: Vec<BoxedSource>, default_search: &str) -> Self {
        Self {
            sources,
            default_search: default_search.trim_end_matches(':').to_string(),
            scheme: Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("static regex"),
        }
    }

    /// Turns a raw query into a source identifier.
    ///
    /// Queries a registered source claims as-is, `scheme://` URLs and absolute
    /// paths pass through. Anything else, colons included, becomes a search
    /// with the default prefix.
    pub fn identifier_for(&self, query: &str) -> Result<String, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        let claimed = self.sources.iter().any(|source| source.can_handle(query));
        if claimed || self.scheme.is_match(query) || std::path::Path::new(query).is_absolute() {
            Ok(query.to_string())
        } else {
            Ok(format!("{}:{}", self.default_search, query))
        }
    }
}

#[async_trait]
impl TrackResolver for SourceManager {
    async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
        let identifier = self.identifier_for(query)?;

        for source in &self.sources {
            if source.can_handle(&identifier) {
                tracing::trace!("Resolving '{}' with source: {}", identifier, source.name());
                return source.resolve(&identifier).await;
            }
        }

        tracing::debug!("No source could handle identifier: {}", identifier);
        Err(ResolveError::Unsupported(identifier))
    }
}
