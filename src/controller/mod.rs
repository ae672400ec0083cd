// src/controller/mod.rs
mod client;
mod commands;
mod launcher;
mod session;

pub use client::{Command, ControlClient};
pub use commands::{Controller, InstanceReply};
pub use launcher::{default_server_binary, InstanceLauncher, LaunchedInstance, ProcessLauncher};
pub use session::{InstanceRecord, Session, SessionStore};

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("no running game session; start the game first (no session file at {0})")]
    NoSession(PathBuf),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}: {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Instance at {url} did not become ready within {timeout:?}")]
    NotReady { url: String, timeout: Duration },

    #[error("Failed to launch game server on port {port}: {source}")]
    Launch {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to terminate process {pid}: {reason}")]
    Terminate { pid: u32, reason: String },

    #[error("Failed to reserve free ports: {0}")]
    Ports(#[source] std::io::Error),

    #[error("Session file {path}: {reason}")]
    Session { path: PathBuf, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
