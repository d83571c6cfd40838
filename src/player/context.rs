use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::{
    error::{PlayerError, PlayerResult},
    manager::{advance, start_playback},
    state::{
        EnqueueOutcome, JoinOutcome, LeaveOutcome, PlaybackState, SessionSnapshot, SessionState,
        StopOutcome,
    },
};
use crate::{
    common::types::{ChannelId, GuildId},
    configs::PlayerConfig,
    protocol::{PlayerEvent, Track, TrackEndReason},
    voice::{CompletionSink, TrackEndNotifier, VoiceHandle, VoiceTransport},
};

/// Playback state machine and queue for one guild.
///
/// Every operation that touches state holds `state` for its whole duration,
/// so operations on one session are totally ordered. Transport calls made
/// under the lock never wait for a track to end; completions come back
/// through [`CompletionSink::track_ended`] on the transport's own task and
/// queue up on the same lock.
pub struct PlaybackSession {
    guild_id: GuildId,
    state: Mutex<SessionState>,
    transport: Arc<dyn VoiceTransport>,
    events: flume::Sender<PlayerEvent>,
    preview_limit: usize,
    this: Weak<PlaybackSession>,
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        transport: Arc<dyn VoiceTransport>,
        events: flume::Sender<PlayerEvent>,
        config: &PlayerConfig,
    ) -> Arc<Self> {
        let volume = config.default_volume.min(100);
        Arc::new_cyclic(|this| Self {
            guild_id,
            state: Mutex::new(SessionState::new(volume)),
            transport,
            events,
            preview_limit: config.queue_preview_limit,
            this: this.clone(),
        })
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub(crate) fn transport(&self) -> &dyn VoiceTransport {
        self.transport.as_ref()
    }

    pub(crate) fn notifier(&self, generation: u64) -> TrackEndNotifier {
        let sink: Weak<dyn CompletionSink> = self.this.clone();
        TrackEndNotifier::new(generation, sink)
    }

    pub(crate) fn emit(&self, event: PlayerEvent) {
        if let Err(flume::TrySendError::Full(event)) = self.events.try_send(event) {
            trace!("[{}] event channel full, dropping {:?}", self.guild_id, event);
        }
    }

    fn voice(state: &SessionState) -> PlayerResult<VoiceHandle> {
        state.voice.clone().ok_or(PlayerError::NotConnected)
    }

    fn emit_track_end(&self, track: Option<Track>, reason: TrackEndReason) {
        if let Some(track) = track {
            self.emit(PlayerEvent::TrackEnd {
                guild_id: self.guild_id.clone(),
                track,
                reason,
            });
        }
    }

    /// Connects to `channel`, or moves there if connected elsewhere.
    ///
    /// The connect itself runs outside the lock; the handle is installed
    /// afterwards. Moving stops playback and clears the queue.
    pub async fn join(&self, channel: ChannelId) -> PlayerResult<JoinOutcome> {
        {
            let state = self.state.lock().await;
            if state.voice.as_ref().is_some_and(|v| v.channel_id == channel) {
                return Ok(JoinOutcome::AlreadyConnected(channel));
            }
        }

        let handle = self
            .transport
            .connect(&self.guild_id, channel)
            .await
            .map_err(PlayerError::TransportConnect)?;

        let mut state = self.state.lock().await;
        match state.voice.take() {
            None => {
                state.voice = Some(handle);
                info!("[{}] joined channel {}", self.guild_id, channel);
                Ok(JoinOutcome::Joined(channel))
            }
            Some(existing) if existing.channel_id == channel => {
                // A concurrent join got there first.
                state.voice = Some(existing);
                drop(state);
                if let Err(e) = self.transport.disconnect(&handle).await {
                    warn!("[{}] failed to drop duplicate connection: {}", self.guild_id, e);
                }
                Ok(JoinOutcome::AlreadyConnected(channel))
            }
            Some(old) => {
                state.invalidate();
                let interrupted = state.current.clone();
                state.reset();
                if let Err(e) = self.transport.disconnect(&old).await {
                    warn!("[{}] failed to close old connection: {}", self.guild_id, e);
                }
                state.voice = Some(handle);
                self.emit_track_end(interrupted, TrackEndReason::Cleanup);
                info!(
                    "[{}] moved from channel {} to {}",
                    self.guild_id, old.channel_id, channel
                );
                Ok(JoinOutcome::Moved {
                    from: old.channel_id,
                    to: channel,
                })
            }
        }
    }

    /// Stops everything and drops the voice connection. Harmless when not
    /// connected.
    pub async fn leave(&self) -> PlayerResult<LeaveOutcome> {
        let mut state = self.state.lock().await;
        let Some(voice) = state.voice.take() else {
            state.reset();
            return Ok(LeaveOutcome::NotConnected);
        };

        state.invalidate();
        let interrupted = state.current.clone();
        state.reset();
        if let Err(e) = self.transport.disconnect(&voice).await {
            warn!("[{}] disconnect failed: {}", self.guild_id, e);
        }
        self.emit_track_end(interrupted, TrackEndReason::Cleanup);
        info!("[{}] left channel {}", self.guild_id, voice.channel_id);
        Ok(LeaveOutcome::Left(voice.channel_id))
    }

    /// Plays `track` right away when idle, otherwise appends it.
    pub async fn enqueue(&self, track: Track) -> PlayerResult<EnqueueOutcome> {
        let mut state = self.state.lock().await;
        if state.voice.is_none() {
            return Err(PlayerError::NotConnected);
        }

        if state.status == PlaybackState::Idle {
            start_playback(self, &mut state, track).await?;
            return Ok(EnqueueOutcome::Started);
        }

        debug!("[{}] queued: {}", self.guild_id, track.title);
        state.queue.push_back(track);
        Ok(EnqueueOutcome::Queued {
            position: state.queue.len(),
        })
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        let mut state = self.state.lock().await;
        if state.status != PlaybackState::Playing {
            return Err(PlayerError::InvalidState {
                operation: "pause",
                state: state.status,
            });
        }

        let voice = Self::voice(&state)?;
        self.transport
            .pause(&voice)
            .await
            .map_err(PlayerError::Transport)?;
        state.status = PlaybackState::Paused;
        Ok(())
    }

    pub async fn resume(&self) -> PlayerResult<()> {
        let mut state = self.state.lock().await;
        if state.status != PlaybackState::Paused {
            return Err(PlayerError::InvalidState {
                operation: "resume",
                state: state.status,
            });
        }

        let voice = Self::voice(&state)?;
        self.transport
            .resume(&voice)
            .await
            .map_err(PlayerError::Transport)?;
        state.status = PlaybackState::Playing;
        Ok(())
    }

    /// Halts playback and clears the queue and loop flag.
    ///
    /// The transport's completion for the halted track is stale by the time
    /// it arrives. Calling this while idle changes nothing.
    pub async fn stop(&self) -> PlayerResult<StopOutcome> {
        let mut state = self.state.lock().await;
        if !state.is_active() {
            state.reset();
            return Ok(StopOutcome::AlreadyIdle);
        }

        state.invalidate();
        let halted = state.current.clone();
        state.reset();
        if let Some(voice) = state.voice.clone() {
            if let Err(e) = self.transport.stop(&voice).await {
                warn!("[{}] transport stop failed: {}", self.guild_id, e);
            }
        }
        self.emit_track_end(halted, TrackEndReason::Stopped);
        info!("[{}] playback stopped", self.guild_id);
        Ok(StopOutcome::Stopped)
    }

    /// Stops the current track and advances without waiting for the
    /// transport. Returns the track that is now playing, if any.
    pub async fn skip(&self) -> PlayerResult<Option<Track>> {
        let mut state = self.state.lock().await;
        if state.status != PlaybackState::Playing {
            return Err(PlayerError::InvalidState {
                operation: "skip",
                state: state.status,
            });
        }

        let voice = Self::voice(&state)?;
        self.transport
            .stop(&voice)
            .await
            .map_err(PlayerError::Transport)?;
        state.invalidate();
        self.emit_track_end(state.current.clone(), TrackEndReason::Stopped);

        advance(self, &mut state).await
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.state.lock().await.loop_enabled = enabled;
    }

    /// Flips the loop flag and returns the new value.
    pub async fn toggle_loop(&self) -> bool {
        let mut state = self.state.lock().await;
        state.loop_enabled = !state.loop_enabled;
        state.loop_enabled
    }

    pub async fn set_volume(&self, percent: i32) -> PlayerResult<()> {
        let volume = u8::try_from(percent)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or(PlayerError::Validation(percent))?;

        let mut state = self.state.lock().await;
        if state.is_active() {
            let voice = Self::voice(&state)?;
            self.transport
                .set_volume(&voice, volume)
                .await
                .map_err(PlayerError::Transport)?;
        }
        state.volume = volume;
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state
            .lock()
            .await
            .snapshot(&self.guild_id, self.preview_limit)
    }
}

#[async_trait]
impl CompletionSink for PlaybackSession {
    async fn track_ended(&self, generation: u64, reason: TrackEndReason) {
        let mut state = self.state.lock().await;
        if generation != state.generation {
            debug!(
                "[{}] ignoring stale track end (gen {} != {}, {})",
                self.guild_id, generation, state.generation, reason
            );
            return;
        }

        self.emit_track_end(state.current.clone(), reason);

        if reason == TrackEndReason::Cleanup {
            // The connection went away underneath us.
            state.invalidate();
            state.voice = None;
            state.reset();
            return;
        }

        if let Err(e) = advance(self, &mut state).await {
            warn!("[{}] could not advance after track end: {}", self.guild_id, e);
        }
    }
}
