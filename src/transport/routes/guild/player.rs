use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::{common::ApiError, common::types::GuildId, server::AppState};

/// GET /v1/guilds/{guildId}/player
///
/// Read-only: never creates a session.
pub async fn get_player(
    Path(guild_id): Path<GuildId>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::debug!("GET /v1/guilds/{}/player", guild_id);
    match state.registry.get(&guild_id) {
        Some(session) => Json(session.snapshot().await).into_response(),
        None => ApiError::not_found(
            format!("No session for guild {guild_id}"),
            format!("/v1/guilds/{guild_id}/player"),
        )
        .into_response(),
    }
}
