// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use ping_pong::{
    config,
    game::Game,
    logging,
    metrics::MetricsRegistry,
    peer::HttpPeerClient,
    server::{GameService, RequestHandler, ServerBuilder},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// One ping-pong game instance.
#[derive(Parser, Debug)]
#[command(name = "pong-server", version, about)]
struct Args {
    /// YAML or JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing(&["ping_pong=debug", "pong_server=debug", "hyper=info"])?;

    let args = Args::parse();
    if let Some(path) = &args.config {
        info!("Loading configuration from: {}", path.display());
    }
    let mut settings = config::load_settings(args.config.as_deref())
        .await
        .context("Failed to load configuration")?
        .server;
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    let registry = Arc::new(MetricsRegistry::new()?);
    let peer_client = Arc::new(HttpPeerClient::new(settings.peer_timeout())?);
    let game = Arc::new(Game::new(peer_client, registry.collector()));
    info!("Game instance {} created", game.instance_id());

    let mut service = GameService::new(game);
    if settings.metrics.enabled {
        service = service.with_metrics(registry, settings.metrics.path.clone());
    }
    let handler = RequestHandler::new(Arc::new(service));

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", settings.host, settings.port))?;

    ServerBuilder::new(addr)
        .with_handler(handler)
        .bind()
        .await
        .with_context(|| format!("Failed to bind {}", addr))?
        .serve_with_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
