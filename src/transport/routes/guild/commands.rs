use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    commands::{Command, CommandError, dispatch},
    common::{
        ApiError,
        types::{ChannelId, GuildId},
    },
    player::PlayerError,
    server::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// The raw chat message, prefix included.
    pub content: String,
    /// Voice channel the author is in, if any.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandReply {
    pub reply: String,
}

/// POST /v1/guilds/{guildId}/commands
pub async fn post_command(
    Path(guild_id): Path<GuildId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandRequest>,
) -> Response {
    let path = format!("/v1/guilds/{guild_id}/commands");
    tracing::debug!("POST {}: {:?}", path, body.content);

    let result = match Command::parse(&state.config.player.command_prefix, &body.content) {
        Ok(command) => dispatch(&state, &guild_id, body.channel_id, command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(reply) => Json(CommandReply { reply }).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::warn!("[{}] command failed: {}", guild_id, e);
            }
            ApiError::new(status, e.to_string(), path).into_response()
        }
    }
}

fn status_for(error: &CommandError) -> StatusCode {
    match error {
        CommandError::NotACommand
        | CommandError::UnknownCommand(_)
        | CommandError::MissingArgument { .. }
        | CommandError::BadArgument { .. } => StatusCode::BAD_REQUEST,
        CommandError::NotInVoice => StatusCode::CONFLICT,
        CommandError::Player(player) => match player {
            PlayerError::InvalidState { .. } | PlayerError::NotConnected => StatusCode::CONFLICT,
            PlayerError::Validation(_) | PlayerError::Resolution(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PlayerError::TransportConnect(_)
            | PlayerError::TransportPlayback(_)
            | PlayerError::Transport(_) => StatusCode::BAD_GATEWAY,
        },
    }
}
