use tracing::error;

use crate::{
    common::Severity,
    player::context::PlaybackSession,
    protocol::{PlayerEvent, Track, TrackException},
    voice::TransportError,
};

/// Logs a rejected `play` and publishes it as a `TrackException`.
pub(crate) fn report_playback_failure(
    session: &PlaybackSession,
    track: &Track,
    err: &TransportError,
) {
    error!(
        "[{}] transport rejected {}: {}",
        session.guild_id(),
        track.title,
        err
    );

    session.emit(PlayerEvent::TrackException {
        guild_id: session.guild_id().clone(),
        track: track.clone(),
        exception: TrackException {
            message: err.to_string(),
            severity: severity_of(err),
        },
    });
}

fn severity_of(err: &TransportError) -> Severity {
    match err {
        TransportError::InvalidStream(_) => Severity::Suspicious,
        _ => Severity::Fault,
    }
}
