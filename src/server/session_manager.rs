use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::{
    common::types::GuildId,
    configs::PlayerConfig,
    player::PlaybackSession,
    protocol::PlayerEvent,
    voice::VoiceTransport,
};

const EVENT_BUFFER: usize = 1024;

/// Guild → session map. Lookups for different guilds never wait on each
/// other or on any session lock. Sessions are never removed; `leave` resets
/// them in place.
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    transport: Arc<dyn VoiceTransport>,
    config: PlayerConfig,
    events_tx: flume::Sender<PlayerEvent>,
    events_rx: flume::Receiver<PlayerEvent>,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>, config: PlayerConfig) -> Self {
        let (events_tx, events_rx) = flume::bounded(EVENT_BUFFER);
        Self {
            sessions: DashMap::new(),
            transport,
            config,
            events_tx,
            events_rx,
        }
    }

    /// Existing session for `guild_id`, or a fresh idle one. At most one
    /// session is ever built per guild, however many callers race here.
    pub fn get_or_create(&self, guild_id: &GuildId) -> Arc<PlaybackSession> {
        if let Some(session) = self.sessions.get(guild_id) {
            return session.value().clone();
        }

        self.sessions
            .entry(guild_id.clone())
            .or_insert_with(|| {
                debug!("Creating session for guild {}", guild_id);
                PlaybackSession::new(
                    guild_id.clone(),
                    self.transport.clone(),
                    self.events_tx.clone(),
                    &self.config,
                )
            })
            .value()
            .clone()
    }

    pub fn get(&self, guild_id: &GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions.get(guild_id).map(|s| s.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Receiving end of every session's event stream.
    pub fn events(&self) -> flume::Receiver<PlayerEvent> {
        self.events_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{configs::TransportConfig, voice::VirtualTransport};

    fn registry() -> SessionRegistry {
        let transport = Arc::new(VirtualTransport::new(&TransportConfig::default()));
        SessionRegistry::new(transport, PlayerConfig::default())
    }

    #[tokio::test]
    async fn lookup_does_not_create() {
        let registry = registry();
        let guild = GuildId::from("1");

        assert!(registry.get(&guild).is_none());
        assert!(registry.is_empty());

        let session = registry.get_or_create(&guild);
        assert!(Arc::ptr_eq(&session, &registry.get(&guild).unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn new_sessions_start_idle_with_default_volume() {
        let registry = registry();
        let snapshot = registry.get_or_create(&GuildId::from("7")).snapshot().await;

        assert_eq!(snapshot.state, crate::player::PlaybackState::Idle);
        assert_eq!(snapshot.volume, PlayerConfig::default().default_volume);
        assert!(!snapshot.is_connected());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creation_builds_one_session() {
        let registry = Arc::new(registry());
        let guild = GuildId::from("42");

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = registry.clone();
                let guild = guild.clone();
                tokio::spawn(async move { registry.get_or_create(&guild) })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert_eq!(registry.len(), 1);
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn guilds_are_isolated() {
        let registry = registry();
        let a = registry.get_or_create(&GuildId::from("a"));
        let b = registry.get_or_create(&GuildId::from("b"));

        a.set_volume(10).await.unwrap();
        assert_eq!(b.snapshot().await.volume, PlayerConfig::default().default_volume);
        assert_eq!(registry.len(), 2);
    }
}
