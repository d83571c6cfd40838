use std::{net::SocketAddr, sync::Arc};

use rustbeat::{
    common::logger,
    configs::Config,
    protocol::PlayerEvent,
    server::{AppState, SessionRegistry},
    sources::SourceManager,
    transport,
    voice::VirtualTransport,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    logger::init(&config.logging);

    let source_manager = Arc::new(SourceManager::new(&config.sources));
    let voice = Arc::new(VirtualTransport::new(&config.transport));
    let registry = SessionRegistry::new(voice, config.player.clone());

    let events = registry.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            log_event(&event);
        }
    });

    let address: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let shared_state = Arc::new(AppState::new(registry, source_manager, config));

    let app = transport::router(shared_state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    info!("Rustbeat listening on {}", address);
    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

fn log_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::TrackStart { guild_id, track } => {
            info!("[{}] Now playing: {}", guild_id, track.title);
        }
        PlayerEvent::TrackEnd {
            guild_id,
            track,
            reason,
        } => {
            info!("[{}] Track ended ({}): {}", guild_id, reason, track.title);
        }
        PlayerEvent::TrackException {
            guild_id,
            track,
            exception,
        } => {
            warn!(
                "[{}] Track failed: {} ({:?}): {}",
                guild_id, track.title, exception.severity, exception.message
            );
        }
        PlayerEvent::QueueEnd { guild_id } => {
            info!("[{}] Queue finished", guild_id);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
