// src/controller/client.rs
use super::ControllerError;
use crate::server::MessageBody;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

const READY_POLL: Duration = Duration::from_millis(100);

/// Parameterless game commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Pause,
    Resume,
    Stop,
}

impl Command {
    pub fn path(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
        }
    }
}

/// HTTP client the controller uses to drive game instances.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
}

impl ControlClient {
    pub fn new(timeout: Duration) -> Result<Self, ControllerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ControllerError::Client)?;

        Ok(Self { client })
    }

    pub async fn send(&self, base: &str, command: Command) -> Result<String, ControllerError> {
        let url = endpoint(base, command.path());
        self.post(&url, &[]).await
    }

    /// `/start` with `peer` as the instance's ping target.
    pub async fn start(
        &self,
        base: &str,
        peer: &str,
        interval_ms: u64,
    ) -> Result<String, ControllerError> {
        let url = endpoint(base, "start");
        let interval = interval_ms.to_string();
        self.post(&url, &[("peerAddress", peer), ("intervalMs", &interval)])
            .await
    }

    pub async fn status(&self, base: &str) -> Result<serde_json::Value, ControllerError> {
        let url = endpoint(base, "status");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ControllerError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControllerError::Rejected {
                url,
                status: status.as_u16(),
                message: rejection_message(response.text().await.unwrap_or_default()),
            });
        }
        response
            .json()
            .await
            .map_err(|source| ControllerError::Transport { url, source })
    }

    /// Poll `/status` until the instance answers or `timeout` elapses.
    pub async fn wait_until_ready(&self, base: &str, timeout: Duration) -> Result<(), ControllerError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.status(base).await {
                Ok(_) => return Ok(()),
                Err(e) if Instant::now() < deadline => {
                    debug!("{} not ready yet: {}", base, e);
                    sleep(READY_POLL).await;
                }
                Err(_) => {
                    return Err(ControllerError::NotReady {
                        url: base.to_string(),
                        timeout,
                    })
                }
            }
        }
    }

    async fn post(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ControllerError> {
        let transport = |source| ControllerError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .post(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ControllerError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                message: rejection_message(text),
            });
        }
        let body: MessageBody = response.json().await.map_err(transport)?;
        Ok(body.message)
    }
}

/// The `message` of a JSON error body, or the raw text for anything else.
fn rejection_message(text: String) -> String {
    match serde_json::from_str::<MessageBody>(&text) {
        Ok(body) => body.message,
        Err(_) => text,
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
