use std::sync::Arc;

use crate::{configs::Config, server::SessionRegistry, sources::TrackResolver};

/// Top-level application state.
pub struct AppState {
    pub registry: SessionRegistry,
    pub resolver: Arc<dyn TrackResolver>,
    pub config: Config,
}

impl AppState {
    pub fn new(registry: SessionRegistry, resolver: Arc<dyn TrackResolver>, config: Config) -> Self {
        Self {
            registry,
            resolver,
            config,
        }
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
