//! The seam between playback sessions and whatever actually moves audio.
//!
//! A [`VoiceTransport`] owns voice connections. Sessions hand it a
//! [`TrackEndNotifier`] with every `play`; the transport fires it exactly once,
//! from its own task, when that track stops for any reason.

pub mod engine;

use std::sync::Weak;

use async_trait::async_trait;

use crate::{
    common::types::{ChannelId, GuildId},
    protocol::{StreamHandle, TrackEndReason},
};

pub use engine::VirtualTransport;

/// A live voice connection, as handed out by [`VoiceTransport::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceHandle {
    pub id: u64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("cannot join channel {channel}: {reason}")]
    ConnectRefused { channel: ChannelId, reason: String },
    #[error("voice connection {0} does not exist")]
    UnknownHandle(u64),
    #[error("invalid stream handle: {0:?}")]
    InvalidStream(String),
    #[error("no track is active on voice connection {0}")]
    NoActiveTrack(u64),
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceHandle, TransportError>;

    /// Starts `stream` and returns without waiting for it to finish.
    ///
    /// On `Ok`, `on_complete` is fired exactly once when the track ends. On
    /// `Err` it is dropped unfired.
    async fn play(
        &self,
        handle: &VoiceHandle,
        stream: &StreamHandle,
        volume: u8,
        on_complete: TrackEndNotifier,
    ) -> Result<(), TransportError>;

    async fn pause(&self, handle: &VoiceHandle) -> Result<(), TransportError>;

    async fn resume(&self, handle: &VoiceHandle) -> Result<(), TransportError>;

    /// Halts the active track, if any. Stopping an idle connection is fine.
    async fn stop(&self, handle: &VoiceHandle) -> Result<(), TransportError>;

    async fn set_volume(&self, handle: &VoiceHandle, volume: u8) -> Result<(), TransportError>;

    async fn disconnect(&self, handle: &VoiceHandle) -> Result<(), TransportError>;
}

/// Receives track-end notifications.
#[async_trait]
pub trait CompletionSink: Send + Sync {
    async fn track_ended(&self, generation: u64, reason: TrackEndReason);
}

/// One-shot completion callback bound to the generation it was issued for.
///
/// The generation is copied in at construction; the receiver decides whether
/// it is still current when the notification lands.
pub struct TrackEndNotifier {
    generation: u64,
    sink: Weak<dyn CompletionSink>,
}

impl TrackEndNotifier {
    pub fn new(generation: u64, sink: Weak<dyn CompletionSink>) -> Self {
        Self { generation, sink }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn notify(self, reason: TrackEndReason) {
        match self.sink.upgrade() {
            Some(sink) => sink.track_ended(self.generation, reason).await,
            None => tracing::trace!(
                "Dropping track end (gen {}): receiver is gone",
                self.generation
            ),
        }
    }
}

impl std::fmt::Debug for TrackEndNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackEndNotifier")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
