// src/controller/session.rs
use super::ControllerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub port: u16,
    pub url: String,
    pub pid: Option<u32>,
    pub log_file: Option<PathBuf>,
}

/// What `start` leaves behind so later invocations can find the instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub instances: Vec<InstanceRecord>,
    pub interval_ms: u64,
    pub started_at: String,
}

impl Session {
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(|instance| instance.url.as_str())
    }

    /// PIDs of the instances this controller spawned itself.
    pub fn pids(&self) -> Vec<u32> {
        self.instances.iter().filter_map(|instance| instance.pid).collect()
    }
}

/// JSON file holding the current [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Session, ControllerError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ControllerError::NoSession(self.path.clone()))
            }
            Err(e) => return Err(self.error(e)),
        };

        let session: Session = serde_json::from_str(&contents).map_err(|e| self.error(e))?;
        if session.instances.is_empty() {
            return Err(ControllerError::NoSession(self.path.clone()));
        }
        Ok(session)
    }

    pub async fn save(&self, session: &Session) -> Result<(), ControllerError> {
        let json = serde_json::to_string_pretty(session).map_err(|e| self.error(e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.error(e))
    }

    /// Delete the session file; a missing file is not an error.
    pub async fn clear(&self) -> Result<(), ControllerError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, reason: impl std::fmt::Display) -> ControllerError {
        ControllerError::Session {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(
            std::env::temp_dir().join(format!("pong-session-{}.json", uuid::Uuid::new_v4())),
        )
    }

    fn session() -> Session {
        Session {
            instances: vec![
                InstanceRecord {
                    port: 9001,
                    url: "http://127.0.0.1:9001".into(),
                    pid: Some(4242),
                    log_file: Some(PathBuf::from("server_9001.log")),
                },
                InstanceRecord {
                    port: 9002,
                    url: "http://127.0.0.1:9002".into(),
                    pid: None,
                    log_file: None,
                },
            ],
            interval_ms: 1000,
            started_at: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_pids_skip_unspawned_instances() {
        assert_eq!(session().pids(), vec![4242]);
    }

    #[tokio::test]
    async fn test_missing_file_means_no_session() {
        let err = store().load().await.unwrap_err();
        assert!(matches!(err, ControllerError::NoSession(_)));
        assert!(err
            .to_string()
            .starts_with("no running game session; start the game first"));
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = store();
        store.save(&session()).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, session());
        assert_eq!(
            loaded.urls().collect::<Vec<_>>(),
            vec!["http://127.0.0.1:9001", "http://127.0.0.1:9002"]
        );

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(ControllerError::NoSession(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let store = store();
        tokio::fs::write(store.path(), "{not json").await.unwrap();

        let err = store.load().await.unwrap_err();
        store.clear().await.unwrap();

        assert!(matches!(err, ControllerError::Session { .. }));
    }
}
