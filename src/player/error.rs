use thiserror::Error;

use super::state::PlaybackState;
use crate::{sources::ResolveError, voice::TransportError};

/// Everything a session operation can report. None of these leave the
/// session in a broken state, and none of them affect other guilds.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("could not resolve track: {0}")]
    Resolution(#[from] ResolveError),

    #[error("could not connect to voice: {0}")]
    TransportConnect(#[source] TransportError),

    /// `play` was rejected. The session is back to idle.
    #[error("could not start playback: {0}")]
    TransportPlayback(#[source] TransportError),

    /// Pause, resume, stop or volume was rejected by the transport.
    #[error("voice transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: PlaybackState,
    },

    #[error("volume must be between 0 and 100, got {0}")]
    Validation(i32),

    #[error("not connected to a voice channel")]
    NotConnected,
}

pub type PlayerResult<T> = Result<T, PlayerError>;
