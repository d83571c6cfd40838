use serde::{Deserialize, Serialize};

use crate::common::types::ChannelId;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportConfig {
    /// Play time assumed for tracks whose length is unknown.
    #[serde(default = "default_track_secs")]
    pub default_track_secs: u64,
    /// Channels the virtual transport refuses to join.
    #[serde(default)]
    pub deny_channels: Vec<ChannelId>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            default_track_secs: default_track_secs(),
            deny_channels: Vec::new(),
        }
    }
}

fn default_track_secs() -> u64 {
    180
}
