// src/controller/launcher.rs
use super::session::InstanceRecord;
use super::ControllerError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedInstance {
    pub pid: Option<u32>,
    pub log_file: Option<PathBuf>,
}

/// Brings game instances up and down on behalf of the controller.
#[async_trait]
pub trait InstanceLauncher: Send + Sync {
    async fn launch(&self, host: &str, port: u16) -> Result<LaunchedInstance, ControllerError>;

    async fn terminate(&self, instance: &InstanceRecord) -> Result<(), ControllerError>;
}

/// `pong-server` in the same directory as the running executable.
pub fn default_server_binary() -> std::io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name(format!("pong-server{}", std::env::consts::EXE_SUFFIX)))
}

/// Spawns each instance as a detached `pong-server` process whose output
/// goes to `server_<port>.log`.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    binary: PathBuf,
    log_dir: PathBuf,
}

impl ProcessLauncher {
    pub fn new(binary: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn log_file(&self, port: u16) -> PathBuf {
        self.log_dir.join(format!("server_{}.log", port))
    }

    fn spawn(&self, host: &str, port: u16, log_file: &Path) -> std::io::Result<u32> {
        let log = std::fs::File::create(log_file)?;
        let mut command = std::process::Command::new(&self.binary);
        command
            .args(["--host", host, "--port", &port.to_string()])
            .stdin(Stdio::null())
            .stdout(log.try_clone()?)
            .stderr(log);

        // Keep the server alive when the controller's terminal goes away.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn()?;
        Ok(child.id())
    }
}

#[async_trait]
impl InstanceLauncher for ProcessLauncher {
    async fn launch(&self, host: &str, port: u16) -> Result<LaunchedInstance, ControllerError> {
        let log_file = self.log_file(port);
        info!(
            "Starting server on port {}, logging to {}...",
            port,
            log_file.display()
        );

        let pid = self
            .spawn(host, port, &log_file)
            .map_err(|source| ControllerError::Launch { port, source })?;

        Ok(LaunchedInstance {
            pid: Some(pid),
            log_file: Some(log_file),
        })
    }

    async fn terminate(&self, instance: &InstanceRecord) -> Result<(), ControllerError> {
        let Some(pid) = instance.pid else {
            warn!("No process id recorded for {}, skipping", instance.url);
            return Ok(());
        };

        let output = tokio::process::Command::new("kill")
            .arg(pid.to_string())
            .output()
            .await
            .map_err(|e| ControllerError::Terminate {
                pid,
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ControllerError::Terminate {
                pid,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!("Terminated server on port {} (pid {})", instance.port, pid);
        Ok(())
    }
}
