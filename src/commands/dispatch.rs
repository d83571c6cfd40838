use std::fmt::Write;

use tracing::debug;

use super::{Command, CommandError};
use crate::{
    common::types::{ChannelId, GuildId},
    player::{
        EnqueueOutcome, JoinOutcome, LeaveOutcome, PlaybackState, PlayerError, SessionSnapshot,
        StopOutcome,
    },
    protocol::Track,
    server::AppState,
};

/// Runs `command` for `guild_id` and renders the reply.
///
/// `voice_channel` is the channel the author is currently in, if any. `play`
/// joins it when the session is not connected yet; the query is resolved
/// before the session lock is taken.
pub async fn dispatch(
    state: &AppState,
    guild_id: &GuildId,
    voice_channel: Option<ChannelId>,
    command: Command,
) -> Result<String, CommandError> {
    debug!("[{}] dispatching {}", guild_id, command.name());
    let session = state.registry.get_or_create(guild_id);

    let reply = match command {
        Command::Join => {
            let channel = voice_channel.ok_or(CommandError::NotInVoice)?;
            match session.join(channel).await? {
                JoinOutcome::Joined(c) => format!("Connected to channel {c}"),
                JoinOutcome::AlreadyConnected(c) => format!("Already connected to channel {c}"),
                JoinOutcome::Moved { from, to } => {
                    format!("Moved from channel {from} to {to}")
                }
            }
        }
        Command::Play(query) => {
            let channel = voice_channel.ok_or(CommandError::NotInVoice)?;
            if !session.snapshot().await.is_connected() {
                session.join(channel).await?;
            }

            let track = state
                .resolver
                .resolve(&query)
                .await
                .map_err(PlayerError::from)?;
            let label = track_label(&track);

            match session.enqueue(track).await? {
                EnqueueOutcome::Started => format!("Now playing: {label}"),
                EnqueueOutcome::Queued { position } => {
                    format!("Added to queue (#{position}): {label}")
                }
            }
        }
        Command::Pause => {
            session.pause().await?;
            "Paused playback".to_string()
        }
        Command::Resume => {
            session.resume().await?;
            "Resumed playback".to_string()
        }
        Command::Stop => match session.stop().await? {
            StopOutcome::Stopped => "Stopped playback and cleared the queue".to_string(),
            StopOutcome::AlreadyIdle => "Nothing is playing".to_string(),
        },
        Command::Skip => match session.skip().await? {
            Some(next) => format!("Skipped. Now playing: {}", track_label(&next)),
            None => "Skipped. The queue is empty".to_string(),
        },
        Command::Queue => render_queue(&session.snapshot().await),
        Command::NowPlaying => render_now_playing(&session.snapshot().await),
        Command::Loop(switch) => {
            let enabled = match switch {
                Some(enabled) => {
                    session.set_loop(enabled).await;
                    enabled
                }
                None => session.toggle_loop().await,
            };
            if enabled {
                "Loop enabled".to_string()
            } else {
                "Loop disabled".to_string()
            }
        }
        Command::Volume(percent) => {
            session.set_volume(percent).await?;
            format!("Volume set to {percent}%")
        }
        Command::Leave => match session.leave().await? {
            LeaveOutcome::Left(c) => format!("Disconnected from channel {c}"),
            LeaveOutcome::NotConnected => "Not connected to a voice channel".to_string(),
        },
    };

    Ok(reply)
}

fn track_label(track: &Track) -> String {
    match track.formatted_duration() {
        Some(duration) => format!("**{}** ({})", track.title, duration),
        None => format!("**{}**", track.title),
    }
}

fn render_queue(snapshot: &SessionSnapshot) -> String {
    if snapshot.current.is_none() && snapshot.queue_len == 0 {
        return "The queue is empty".to_string();
    }

    let mut out = String::new();
    if let Some(current) = &snapshot.current {
        let _ = writeln!(out, "Now playing: {}", track_label(current));
    }

    if snapshot.queue_len == 0 {
        out.push_str("No more tracks in the queue");
        return out;
    }

    out.push_str("Up next:");
    for (i, track) in snapshot.queue.iter().enumerate() {
        let _ = write!(out, "\n{}. {}", i + 1, track_label(track));
    }
    let hidden = snapshot.queue_len.saturating_sub(snapshot.queue.len());
    if hidden > 0 {
        let _ = write!(out, "\n...and {hidden} more");
    }
    out
}

fn render_now_playing(snapshot: &SessionSnapshot) -> String {
    let Some(current) = &snapshot.current else {
        return "Nothing is playing".to_string();
    };

    let mut out = format!("Now playing: {}", track_label(current));
    if snapshot.state == PlaybackState::Paused {
        out.push_str(" [paused]");
    }
    if snapshot.loop_enabled {
        out.push_str(" [loop]");
    }
    let _ = write!(out, " at {}% volume", snapshot.volume);
    out
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        configs::{Config, PlayerConfig},
        protocol::StreamHandle,
        server::SessionRegistry,
        sources::{ResolveError, TrackResolver},
        voice::VirtualTransport,
    };

    /// Every query resolves to a track titled after it, except "missing".
    struct TitleResolver;

    #[async_trait]
    impl TrackResolver for TitleResolver {
        async fn resolve(&self, query: &str) -> Result<Track, ResolveError> {
            if query == "missing" {
                return Err(ResolveError::NoMatches(query.to_string()));
            }
            Ok(Track::new(query, format!("test://{query}"), StreamHandle::new(query))
                .with_duration(125))
        }
    }

    fn app() -> AppState {
        let transport = Arc::new(VirtualTransport::with_default_track(Duration::from_secs(3600)));
        let player = PlayerConfig {
            queue_preview_limit: 2,
            ..PlayerConfig::default()
        };
        AppState::new(
            SessionRegistry::new(transport, player),
            Arc::new(TitleResolver),
            Config::default(),
        )
    }

    async fn run(app: &AppState, text: &str) -> Result<String, CommandError> {
        let command = Command::parse("!", text)?;
        dispatch(app, &GuildId::from("g"), Some(ChannelId(5)), command).await
    }

    #[tokio::test]
    async fn play_auto_joins_then_queues() {
        let app = app();

        assert_eq!(run(&app, "!play intro").await.unwrap(), "Now playing: **intro** (2:05)");
        assert_eq!(
            run(&app, "!p outro").await.unwrap(),
            "Added to queue (#1): **outro** (2:05)"
        );

        let snapshot = app.registry.get(&GuildId::from("g")).unwrap().snapshot().await;
        assert_eq!(snapshot.channel_id, Some(ChannelId(5)));
        assert_eq!(snapshot.queue_len, 1);
    }

    #[tokio::test]
    async fn play_requires_a_voice_channel() {
        let app = app();
        let err = dispatch(
            &app,
            &GuildId::from("g"),
            None,
            Command::Play("x".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CommandError::NotInVoice));
    }

    #[tokio::test]
    async fn failed_resolution_leaves_session_idle() {
        let app = app();
        let err = run(&app, "!play missing").await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Player(PlayerError::Resolution(ResolveError::NoMatches(_)))
        ));

        let snapshot = app.registry.get(&GuildId::from("g")).unwrap().snapshot().await;
        assert_eq!(snapshot.state, PlaybackState::Idle);
        assert!(snapshot.current.is_none());
    }

    #[tokio::test]
    async fn queue_listing_is_truncated() {
        let app = app();
        for title in ["a", "b", "c", "d"] {
            run(&app, &format!("!play {title}")).await.unwrap();
        }

        let listing = run(&app, "!q").await.unwrap();
        assert_eq!(
            listing,
            "Now playing: **a** (2:05)\nUp next:\n1. **b** (2:05)\n2. **c** (2:05)\n...and 1 more"
        );
    }

    #[tokio::test]
    async fn control_commands_follow_the_state_machine() {
        let app = app();
        assert_eq!(run(&app, "!np").await.unwrap(), "Nothing is playing");
        assert_eq!(run(&app, "!queue").await.unwrap(), "The queue is empty");
        assert!(matches!(
            run(&app, "!pause").await.unwrap_err(),
            CommandError::Player(PlayerError::InvalidState { operation: "pause", .. })
        ));

        run(&app, "!play song").await.unwrap();
        assert_eq!(run(&app, "!pause").await.unwrap(), "Paused playback");
        assert_eq!(run(&app, "!loop").await.unwrap(), "Loop enabled");
        assert_eq!(
            run(&app, "!np").await.unwrap(),
            "Now playing: **song** (2:05) [paused] [loop] at 50% volume"
        );
        assert_eq!(run(&app, "!continue").await.unwrap(), "Resumed playback");
        assert_eq!(run(&app, "!vol 80").await.unwrap(), "Volume set to 80%");
        assert!(matches!(
            run(&app, "!vol 101").await.unwrap_err(),
            CommandError::Player(PlayerError::Validation(101))
        ));

        assert_eq!(
            run(&app, "!stop").await.unwrap(),
            "Stopped playback and cleared the queue"
        );
        assert_eq!(run(&app, "!stop").await.unwrap(), "Nothing is playing");
    }

    #[tokio::test]
    async fn skip_reports_the_next_track() {
        let app = app();
        run(&app, "!play one").await.unwrap();
        run(&app, "!play two").await.unwrap();

        assert_eq!(run(&app, "!skip").await.unwrap(), "Skipped. Now playing: **two** (2:05)");
        assert_eq!(run(&app, "!next").await.unwrap(), "Skipped. The queue is empty");
    }

    #[tokio::test]
    async fn join_and_leave() {
        let app = app();
        assert_eq!(run(&app, "!leave").await.unwrap(), "Not connected to a voice channel");
        assert_eq!(run(&app, "!join").await.unwrap(), "Connected to channel 5");
        assert_eq!(run(&app, "!connect").await.unwrap(), "Already connected to channel 5");

        let moved = dispatch(&app, &GuildId::from("g"), Some(ChannelId(9)), Command::Join)
            .await
            .unwrap();
        assert_eq!(moved, "Moved from channel 5 to 9");
        assert_eq!(run(&app, "!disconnect").await.unwrap(), "Disconnected from channel 9");
    }
}
