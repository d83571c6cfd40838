use std::collections::VecDeque;

use serde::Serialize;

use crate::{
    common::types::{ChannelId, GuildId},
    protocol::Track,
    voice::VoiceHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Everything the session lock protects.
pub(crate) struct SessionState {
    pub status: PlaybackState,
    pub queue: VecDeque<Track>,
    pub current: Option<Track>,
    pub loop_enabled: bool,
    pub volume: u8,
    pub voice: Option<VoiceHandle>,
    /// Bumped on every play and on every explicit halt. Completions carrying
    /// any other value are stale.
    pub generation: u64,
}

impl SessionState {
    pub fn new(volume: u8) -> Self {
        Self {
            status: PlaybackState::Idle,
            queue: VecDeque::new(),
            current: None,
            loop_enabled: false,
            volume,
            voice: None,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status != PlaybackState::Idle
    }

    /// Makes every outstanding completion stale.
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn set_idle(&mut self) {
        self.current = None;
        self.status = PlaybackState::Idle;
    }

    /// The stop/leave reset: nothing current, nothing queued, loop off.
    pub fn reset(&mut self) {
        self.set_idle();
        self.queue.clear();
        self.loop_enabled = false;
    }

    pub fn snapshot(&self, guild_id: &GuildId, preview_limit: usize) -> SessionSnapshot {
        SessionSnapshot {
            guild_id: guild_id.clone(),
            state: self.status,
            current: self.current.clone(),
            queue: self.queue.iter().take(preview_limit).cloned().collect(),
            queue_len: self.queue.len(),
            loop_enabled: self.loop_enabled,
            volume: self.volume,
            channel_id: self.voice.as_ref().map(|v| v.channel_id),
        }
    }
}

/// A consistent read of one session, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub guild_id: GuildId,
    pub state: PlaybackState,
    pub current: Option<Track>,
    /// At most `queue_preview_limit` tracks from the head of the queue.
    pub queue: Vec<Track>,
    pub queue_len: usize,
    pub loop_enabled: bool,
    pub volume: u8,
    pub channel_id: Option<ChannelId>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The session was idle; the track is now playing.
    Started,
    /// Appended behind the current track; 1-based position in the queue.
    Queued { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(ChannelId),
    AlreadyConnected(ChannelId),
    /// Left `from` and joined `to`; whatever was playing was stopped.
    Moved { from: ChannelId, to: ChannelId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left(ChannelId),
    NotConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyIdle,
}
