use serde::Serialize;

use crate::{
    common::{Severity, types::GuildId},
    protocol::tracks::Track,
};

/// Events a session publishes as playback moves along.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    #[serde(rename = "TrackStartEvent")]
    TrackStart {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
        track: Track,
    },

    #[serde(rename = "TrackEndEvent")]
    TrackEnd {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
        track: Track,
        reason: TrackEndReason,
    },

    #[serde(rename = "TrackExceptionEvent")]
    TrackException {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
        track: Track,
        exception: TrackException,
    },

    /// The last queued track ended and nothing replaced it.
    #[serde(rename = "QueueEndEvent")]
    QueueEnd {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
    },
}

impl PlayerEvent {
    pub fn guild_id(&self) -> &GuildId {
        match self {
            Self::TrackStart { guild_id, .. }
            | Self::TrackEnd { guild_id, .. }
            | Self::TrackException { guild_id, .. }
            | Self::QueueEnd { guild_id } => guild_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackEndReason {
    /// Ran to the end on its own.
    Finished,
    /// Halted by an explicit stop on the transport.
    Stopped,
    /// Another `play` on the same connection took over.
    Replaced,
    /// The connection it was playing on went away.
    Cleanup,
}

impl std::fmt::Display for TrackEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Finished => "finished",
            Self::Stopped => "stopped",
            Self::Replaced => "replaced",
            Self::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackException {
    pub message: String,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tracks::StreamHandle;

    #[test]
    fn events_are_tagged_by_type() {
        let event = PlayerEvent::TrackEnd {
            guild_id: GuildId::from("1"),
            track: Track::new("a", "file:///a.mp3", StreamHandle::new("/a.mp3")),
            reason: TrackEndReason::Finished,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TrackEndEvent");
        assert_eq!(json["guildId"], "1");
        assert_eq!(json["reason"], "finished");
        assert_eq!(event.guild_id(), &GuildId::from("1"));
    }
}
