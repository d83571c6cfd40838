use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Volume new sessions start with, 0-100.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    /// How many queued tracks a snapshot carries.
    #[serde(default = "default_queue_preview_limit")]
    pub queue_preview_limit: usize,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            queue_preview_limit: default_queue_preview_limit(),
            command_prefix: default_command_prefix(),
        }
    }
}

fn default_volume() -> u8 {
    50
}

fn default_queue_preview_limit() -> usize {
    10
}

fn default_command_prefix() -> String {
    "!".to_string()
}
