// src/controller/commands.rs
use super::client::{Command, ControlClient};
use super::launcher::InstanceLauncher;
use super::session::{InstanceRecord, Session, SessionStore};
use super::ControllerError;
use crate::config::ControllerSettings;
use crate::server::find_free_ports;
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

/// Answer of one instance to a broadcast command.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceReply<T> {
    pub url: String,
    pub reply: T,
}

/// Drives a set of game instances: launches them, wires each to its
/// successor in a ring, and fans commands out to all of them.
pub struct Controller<L> {
    settings: ControllerSettings,
    client: ControlClient,
    store: SessionStore,
    launcher: L,
}

impl<L: InstanceLauncher> Controller<L> {
    pub fn new(settings: ControllerSettings, launcher: L) -> Result<Self, ControllerError> {
        let client = ControlClient::new(settings.request_timeout())?;
        let store = SessionStore::new(settings.state_file.clone());

        Ok(Self {
            settings,
            client,
            store,
            launcher,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Launch `instances` servers, start the game on each, and send the first ping.
    pub async fn start(&self, interval_ms: u64, instances: usize) -> Result<Session, ControllerError> {
        if interval_ms == 0 {
            return Err(ControllerError::InvalidArgument(
                "interval must be greater than 0 ms".into(),
            ));
        }
        if instances < 2 {
            return Err(ControllerError::InvalidArgument(format!(
                "at least 2 instances are needed, got {}",
                instances
            )));
        }
        if let Ok(previous) = self.store.load().await {
            warn!(
                "Replacing previous session with {} instances started at {}; \
                 its servers are left running (pids {:?}, urls {:?})",
                previous.instances.len(),
                previous.started_at,
                previous.pids(),
                previous.urls().collect::<Vec<_>>()
            );
        }

        let host = self.settings.host.as_str();
        let ports = find_free_ports(host, instances).map_err(ControllerError::Ports)?;

        let mut records = Vec::with_capacity(instances);
        for port in ports {
            match self.launcher.launch(host, port).await {
                Ok(launched) => records.push(InstanceRecord {
                    port,
                    url: format!("http://{}:{}", host, port),
                    pid: launched.pid,
                    log_file: launched.log_file,
                }),
                Err(e) => {
                    self.terminate_all(&records).await;
                    return Err(e);
                }
            }
        }

        let session = Session {
            instances: records,
            interval_ms,
            started_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        // Saved before anything can fail so `stop --terminate` can clean up.
        self.store.save(&session).await?;

        for instance in &session.instances {
            self.client
                .wait_until_ready(&instance.url, self.settings.startup_timeout())
                .await?;
        }
        info!(
            "All {} servers started on ports {:?}",
            session.instances.len(),
            session.instances.iter().map(|i| i.port).collect::<Vec<_>>()
        );

        let urls: Vec<&str> = session.urls().collect();
        for (index, url) in urls.iter().enumerate() {
            let peer = urls[(index + 1) % urls.len()];
            self.client.start(url, peer, interval_ms).await?;
        }

        info!("{} sends the first ping to {}", urls[0], urls[1]);
        self.client.send(urls[0], Command::Ping).await?;

        Ok(session)
    }

    pub async fn pause(&self) -> Result<Vec<InstanceReply<String>>, ControllerError> {
        self.broadcast(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<Vec<InstanceReply<String>>, ControllerError> {
        self.broadcast(Command::Resume).await
    }

    /// Stop the game on every instance. With `terminate`, the server processes
    /// are shut down too and the session is forgotten; unreachable instances
    /// do not prevent the others from being terminated.
    pub async fn stop(&self, terminate: bool) -> Result<Vec<InstanceReply<String>>, ControllerError> {
        if !terminate {
            return self.broadcast(Command::Stop).await;
        }

        let session = self.store.load().await?;
        let mut replies = Vec::with_capacity(session.instances.len());
        let mut first_error = None;

        for instance in &session.instances {
            match self.client.send(&instance.url, Command::Stop).await {
                Ok(reply) => replies.push(InstanceReply {
                    url: instance.url.clone(),
                    reply,
                }),
                Err(e) => {
                    warn!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        self.terminate_all(&session.instances).await;
        self.store.clear().await?;

        match first_error {
            Some(e) => Err(e),
            None => Ok(replies),
        }
    }

    pub async fn status(&self) -> Result<Vec<InstanceReply<serde_json::Value>>, ControllerError> {
        let session = self.store.load().await?;
        let mut replies = Vec::with_capacity(session.instances.len());

        for url in session.urls() {
            let reply = self.client.status(url).await?;
            replies.push(InstanceReply {
                url: url.to_string(),
                reply,
            });
        }
        Ok(replies)
    }

    /// Send `command` to every instance, aborting on the first failure.
    async fn broadcast(&self, command: Command) -> Result<Vec<InstanceReply<String>>, ControllerError> {
        let session = self.store.load().await?;
        let mut replies = Vec::with_capacity(session.instances.len());

        for url in session.urls() {
            let reply = self.client.send(url, command).await?;
            info!("{} -> {}: {}", command.path(), url, reply);
            replies.push(InstanceReply {
                url: url.to_string(),
                reply,
            });
        }
        Ok(replies)
    }

    async fn terminate_all(&self, instances: &[InstanceRecord]) {
        for instance in instances {
            if let Err(e) = self.launcher.terminate(instance).await {
                warn!("{}", e);
            }
        }
    }
}
