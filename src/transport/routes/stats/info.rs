use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    pub version: String,
    pub sessions: usize,
    pub sources: Vec<String>,
}

/// GET /v1/info
pub async fn get_info(State(state): State<Arc<AppState>>) -> Json<Info> {
    tracing::debug!("GET /v1/info");
    let mut sources = Vec::new();
    if state.config.sources.http {
        sources.push("http".to_string());
    }
    if state.config.sources.local {
        sources.push("local".to_string());
    }

    Json(Info {
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.registry.len(),
        sources,
    })
}

/// GET /version
pub async fn get_version() -> String {
    tracing::debug!("GET /version");
    env!("CARGO_PKG_VERSION").to_string()
}
