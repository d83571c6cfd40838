use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "enabled")]
    pub http: bool,
    #[serde(default = "enabled")]
    pub local: bool,
    /// Issue a `HEAD` request before accepting an http track.
    #[serde(default)]
    pub http_probe: bool,
    /// Prefix given to queries that carry no scheme of their own.
    #[serde(default = "default_search")]
    pub default_search: String,
    /// Directories `localsearch:` walks.
    #[serde(default)]
    pub local_directories: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            http: true,
            local: true,
            http_probe: false,
            default_search: default_search(),
            local_directories: Vec::new(),
        }
    }
}

fn enabled() -> bool {
    true
}

fn default_search() -> String {
    "localsearch".to_string()
}
