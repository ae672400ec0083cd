// tests/common/mod.rs
#![allow(dead_code)]

use ping_pong::game::Game;
use ping_pong::metrics::MetricsRegistry;
use ping_pong::peer::HttpPeerClient;
use ping_pong::server::{GameService, MessageBody, RequestHandler, ServerBuilder};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn handler() -> RequestHandler {
    let registry = Arc::new(MetricsRegistry::new().unwrap());
    let peer = Arc::new(HttpPeerClient::new(Duration::from_secs(1)).unwrap());
    let game = Arc::new(Game::new(peer, registry.collector()));
    RequestHandler::new(Arc::new(
        GameService::new(game).with_metrics(registry, "/metrics"),
    ))
}

/// Serve a fresh game instance on `addr` inside the test runtime.
pub async fn spawn_instance_on(addr: SocketAddr) -> anyhow::Result<(String, JoinHandle<()>)> {
    let server = ServerBuilder::new(addr)
        .with_handler(handler())
        .bind()
        .await?;
    let url = format!("http://{}", server.local_addr()?);

    let handle = tokio::spawn(async move {
        let _ = server.serve_with_shutdown(std::future::pending()).await;
    });
    Ok((url, handle))
}

pub async fn spawn_instance() -> (String, JoinHandle<()>) {
    spawn_instance_on("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
}

pub async fn post(client: &reqwest::Client, url: &str) -> String {
    let body: MessageBody = client
        .post(url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body.message
}

pub async fn status(client: &reqwest::Client, base: &str) -> serde_json::Value {
    client
        .get(format!("{}/status", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pong-{}-{}", uuid::Uuid::new_v4(), name))
}
