use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{TrackEndNotifier, TransportError, VoiceHandle, VoiceTransport};
use crate::{
    common::types::{ChannelId, GuildId},
    configs::TransportConfig,
    protocol::{StreamHandle, TrackEndReason},
};

enum TrackCommand {
    Pause,
    Resume,
    Stop(TrackEndReason),
}

struct Connection {
    guild_id: GuildId,
    channel_id: ChannelId,
    volume: u8,
    active: Option<flume::Sender<TrackCommand>>,
}

/// An in-process transport that keeps time instead of sending audio.
///
/// Every `play` spawns a task that waits out the track length (pausable) and
/// then fires the completion notifier.
pub struct VirtualTransport {
    next_id: AtomicU64,
    connections: DashMap<u64, Connection>,
    default_track: Duration,
    deny_channels: Vec<ChannelId>,
}

impl VirtualTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connections: DashMap::new(),
            default_track: Duration::from_secs(config.default_track_secs),
            deny_channels: config.deny_channels.clone(),
        }
    }

    pub fn with_default_track(default_track: Duration) -> Self {
        Self {
            default_track,
            ..Self::new(&TransportConfig::default())
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn volume_of(&self, handle: &VoiceHandle) -> Option<u8> {
        self.connections.get(&handle.id).map(|c| c.volume)
    }

    fn with_connection<R>(
        &self,
        handle: &VoiceHandle,
        f: impl FnOnce(&mut Connection) -> R,
    ) -> Result<R, TransportError> {
        self.connections
            .get_mut(&handle.id)
            .map(|mut conn| f(&mut conn))
            .ok_or(TransportError::UnknownHandle(handle.id))
    }

    fn send_to_active(&self, handle: &VoiceHandle, cmd: TrackCommand) -> Result<(), TransportError> {
        let delivered = self.with_connection(handle, |conn| {
            conn.active
                .as_ref()
                .is_some_and(|tx| tx.send(cmd).is_ok())
        })?;
        if delivered {
            Ok(())
        } else {
            Err(TransportError::NoActiveTrack(handle.id))
        }
    }
}

#[async_trait]
impl VoiceTransport for VirtualTransport {
    async fn connect(
        &self,
        guild_id: &GuildId,
        channel_id: ChannelId,
    ) -> Result<VoiceHandle, TransportError> {
        if self.deny_channels.contains(&channel_id) {
            return Err(TransportError::ConnectRefused {
                channel: channel_id,
                reason: "missing permission to connect".into(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(
            id,
            Connection {
                guild_id: guild_id.clone(),
                channel_id,
                volume: 100,
                active: None,
            },
        );
        info!("[{}] voice connection {} opened on channel {}", guild_id, id, channel_id);

        Ok(VoiceHandle {
            id,
            guild_id: guild_id.clone(),
            channel_id,
        })
    }

    async fn play(
        &self,
        handle: &VoiceHandle,
        stream: &StreamHandle,
        volume: u8,
        on_complete: TrackEndNotifier,
    ) -> Result<(), TransportError> {
        if stream.is_empty() {
            return Err(TransportError::InvalidStream(stream.locator.clone()));
        }

        let (tx, rx) = flume::unbounded();
        let previous = self.with_connection(handle, |conn| {
            conn.volume = volume;
            conn.active.replace(tx)
        })?;
        if let Some(previous) = previous {
            let _ = previous.send(TrackCommand::Stop(TrackEndReason::Replaced));
        }

        let length = stream.length.unwrap_or(self.default_track);
        debug!(
            "[{}] connection {} playing {} for {:?} (gen {})",
            handle.guild_id,
            handle.id,
            stream.locator,
            length,
            on_complete.generation()
        );
        tokio::spawn(run_track(handle.id, rx, length, on_complete));
        Ok(())
    }

    async fn pause(&self, handle: &VoiceHandle) -> Result<(), TransportError> {
        self.send_to_active(handle, TrackCommand::Pause)
    }

    async fn resume(&self, handle: &VoiceHandle) -> Result<(), TransportError> {
        self.send_to_active(handle, TrackCommand::Resume)
    }

    async fn stop(&self, handle: &VoiceHandle) -> Result<(), TransportError> {
        if let Some(tx) = self.with_connection(handle, |conn| conn.active.take())? {
            let _ = tx.send(TrackCommand::Stop(TrackEndReason::Stopped));
        }
        Ok(())
    }

    async fn set_volume(&self, handle: &VoiceHandle, volume: u8) -> Result<(), TransportError> {
        self.with_connection(handle, |conn| conn.volume = volume)
    }

    async fn disconnect(&self, handle: &VoiceHandle) -> Result<(), TransportError> {
        let (_, conn) = self
            .connections
            .remove(&handle.id)
            .ok_or(TransportError::UnknownHandle(handle.id))?;
        if let Some(tx) = conn.active {
            let _ = tx.send(TrackCommand::Stop(TrackEndReason::Cleanup));
        }
        info!(
            "[{}] voice connection {} closed on channel {}",
            conn.guild_id, handle.id, conn.channel_id
        );
        Ok(())
    }
}

async fn run_track(
    connection: u64,
    control: flume::Receiver<TrackCommand>,
    length: Duration,
    on_complete: TrackEndNotifier,
) {
    let mut remaining = length;
    let mut paused = false;

    let reason = loop {
        if paused {
            match control.recv_async().await {
                Ok(TrackCommand::Resume) => paused = false,
                Ok(TrackCommand::Pause) => {}
                Ok(TrackCommand::Stop(reason)) => break reason,
                Err(_) => break TrackEndReason::Cleanup,
            }
            continue;
        }

        let started = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => break TrackEndReason::Finished,
            cmd = control.recv_async() => {
                remaining = remaining.saturating_sub(started.elapsed());
                match cmd {
                    Ok(TrackCommand::Pause) => paused = true,
                    Ok(TrackCommand::Resume) => {}
                    Ok(TrackCommand::Stop(reason)) => break reason,
                    Err(_) => break TrackEndReason::Cleanup,
                }
            }
        }
    };

    debug!(
        "connection {} track ended: {} (gen {})",
        connection,
        reason,
        on_complete.generation()
    );
    on_complete.notify(reason).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::voice::CompletionSink;

    struct Recorder(flume::Sender<(u64, TrackEndReason)>);

    #[async_trait]
    impl CompletionSink for Recorder {
        async fn track_ended(&self, generation: u64, reason: TrackEndReason) {
            let _ = self.0.send((generation, reason));
        }
    }

    fn recorder() -> (Arc<Recorder>, flume::Receiver<(u64, TrackEndReason)>) {
        let (tx, rx) = flume::unbounded();
        (Arc::new(Recorder(tx)), rx)
    }

    fn notifier(sink: &Arc<Recorder>, generation: u64) -> TrackEndNotifier {
        let sink: Arc<dyn CompletionSink> = sink.clone();
        TrackEndNotifier::new(generation, Arc::downgrade(&sink))
    }

    fn stream(ms: u64) -> StreamHandle {
        StreamHandle::new("/music/a.mp3").with_length(Duration::from_millis(ms))
    }

    async fn connected() -> (VirtualTransport, VoiceHandle) {
        let transport = VirtualTransport::with_default_track(Duration::from_secs(1));
        let handle = transport
            .connect(&GuildId::from("g"), ChannelId(7))
            .await
            .unwrap();
        (transport, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn track_finishes_after_its_length() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        transport
            .play(&handle, &stream(100), 50, notifier(&sink, 3))
            .await
            .unwrap();

        assert_eq!(rx.recv_async().await.unwrap(), (3, TrackEndReason::Finished));
        assert_eq!(transport.volume_of(&handle), Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_fires_stopped_exactly_once() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        transport
            .play(&handle, &stream(10_000), 100, notifier(&sink, 1))
            .await
            .unwrap();
        transport.stop(&handle).await.unwrap();
        transport.stop(&handle).await.unwrap();

        assert_eq!(rx.recv_async().await.unwrap(), (1, TrackEndReason::Stopped));
        let extra = tokio::time::timeout(Duration::from_secs(30), rx.recv_async()).await;
        assert!(extra.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_clock() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        transport
            .play(&handle, &stream(100), 100, notifier(&sink, 1))
            .await
            .unwrap();
        transport.pause(&handle).await.unwrap();

        let early = tokio::time::timeout(Duration::from_secs(5), rx.recv_async()).await;
        assert!(early.is_err(), "paused track must not finish");

        transport.resume(&handle).await.unwrap();
        assert_eq!(rx.recv_async().await.unwrap(), (1, TrackEndReason::Finished));
    }

    #[tokio::test(start_paused = true)]
    async fn second_play_replaces_the_first() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        transport
            .play(&handle, &stream(10_000), 100, notifier(&sink, 1))
            .await
            .unwrap();
        transport
            .play(&handle, &stream(50), 100, notifier(&sink, 2))
            .await
            .unwrap();

        assert_eq!(rx.recv_async().await.unwrap(), (1, TrackEndReason::Replaced));
        assert_eq!(rx.recv_async().await.unwrap(), (2, TrackEndReason::Finished));
    }

    #[tokio::test]
    async fn denied_channel_is_refused() {
        let transport = VirtualTransport::new(&TransportConfig {
            default_track_secs: 1,
            deny_channels: vec![ChannelId(9)],
        });

        let err = transport
            .connect(&GuildId::from("g"), ChannelId(9))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectRefused { .. }));
        assert_eq!(transport.connection_count(), 0);
    }

    #[tokio::test]
    async fn empty_stream_fails_without_firing() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        let err = transport
            .play(&handle, &StreamHandle::new(""), 100, notifier(&sink, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidStream(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cleans_up_active_track() {
        let (transport, handle) = connected().await;
        let (sink, rx) = recorder();

        transport
            .play(&handle, &stream(10_000), 100, notifier(&sink, 4))
            .await
            .unwrap();
        transport.disconnect(&handle).await.unwrap();

        assert_eq!(rx.recv_async().await.unwrap(), (4, TrackEndReason::Cleanup));
        assert_eq!(
            transport.pause(&handle).await.unwrap_err(),
            TransportError::UnknownHandle(handle.id)
        );
    }
}
