use tracing::info;

use super::error::report_playback_failure;
use crate::{
    player::{
        context::PlaybackSession,
        error::{PlayerError, PlayerResult},
        state::{PlaybackState, SessionState},
    },
    protocol::{PlayerEvent, Track},
};

/// Makes `track` current and hands it to the transport.
///
/// The notifier registered with the transport carries the generation minted
/// here. If the transport refuses the track the session drops back to idle;
/// nothing further is dequeued.
pub(crate) async fn start_playback(
    session: &PlaybackSession,
    state: &mut SessionState,
    track: Track,
) -> PlayerResult<()> {
    let Some(voice) = state.voice.clone() else {
        state.set_idle();
        return Err(PlayerError::NotConnected);
    };

    let generation = state.invalidate();
    state.current = Some(track.clone());
    state.status = PlaybackState::Playing;

    let notifier = session.notifier(generation);
    if let Err(e) = session
        .transport()
        .play(&voice, &track.stream_handle, state.volume, notifier)
        .await
    {
        state.invalidate();
        state.set_idle();
        report_playback_failure(session, &track, &e);
        return Err(PlayerError::TransportPlayback(e));
    }

    info!(
        "[{}] Playback starting: {} (gen {})",
        session.guild_id(),
        track.title,
        generation
    );
    session.emit(PlayerEvent::TrackStart {
        guild_id: session.guild_id().clone(),
        track,
    });
    Ok(())
}
