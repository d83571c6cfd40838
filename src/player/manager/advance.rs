use super::start::start_playback;
use crate::{
    player::{context::PlaybackSession, error::PlayerResult, state::SessionState},
    protocol::{PlayerEvent, Track},
};

/// Picks what plays after the current track: the current track again when
/// looping, else the head of the queue, else nothing.
///
/// Callers must have already made the previous generation stale.
pub(crate) async fn advance(
    session: &PlaybackSession,
    state: &mut SessionState,
) -> PlayerResult<Option<Track>> {
    if state.loop_enabled {
        if let Some(current) = state.current.clone() {
            start_playback(session, state, current.clone()).await?;
            return Ok(Some(current));
        }
    }

    match state.queue.pop_front() {
        Some(next) => {
            start_playback(session, state, next.clone()).await?;
            Ok(Some(next))
        }
        None => {
            let was_playing = state.current.is_some();
            state.set_idle();
            if was_playing {
                session.emit(PlayerEvent::QueueEnd {
                    guild_id: session.guild_id().clone(),
                });
            }
            Ok(None)
        }
    }
}
