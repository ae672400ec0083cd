// src/peer/client.rs
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Peer {peer} unreachable: {source}")]
    Transport {
        peer: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Peer {peer} answered HTTP {status}")]
    Rejected { peer: String, status: u16 },
}

/// Outbound side of the exchange: delivers one ping to a peer instance.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn send_ping(&self, peer: &Url) -> Result<(), PeerError>;
}

#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PeerError::Client)?;

        Ok(Self { client })
    }
}

/// `<peer>/ping`, tolerating a trailing slash on the peer address.
pub(crate) fn ping_url(peer: &Url) -> String {
    format!("{}/ping", peer.as_str().trim_end_matches('/'))
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn send_ping(&self, peer: &Url) -> Result<(), PeerError> {
        let url = ping_url(peer);
        debug!("Sending ping to {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|source| PeerError::Transport {
                peer: peer.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Rejected {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
