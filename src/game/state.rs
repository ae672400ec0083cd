// src/game/state.rs
use super::countdown::Countdown;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Idle,
    Running,
    Paused,
}

impl GameStatus {
    pub fn as_gauge(&self) -> i64 {
        match self {
            GameStatus::Idle => 0,
            GameStatus::Running => 1,
            GameStatus::Paused => 2,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Missing query parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("intervalMs must be a positive integer, got '{0}'")]
    InvalidInterval(String),

    #[error("Invalid peer address '{address}': {reason}")]
    InvalidPeerAddress { address: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    Pong { cycle: u64, deadline: Instant },
    NotRunning,
}

impl PingOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            PingOutcome::Pong { .. } => "pong",
            PingOutcome::NotRunning => "Game is paused or not started",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused { suspended: Vec<u64> },
    AlreadyPaused,
}

impl PauseOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            PauseOutcome::Paused { .. } => "Game paused",
            PauseOutcome::AlreadyPaused => "Game is already paused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    Resumed { rearmed: Vec<(u64, Instant)> },
    AlreadyRunning,
    NotStarted,
}

impl ResumeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ResumeOutcome::Resumed { .. } => "Game resumed",
            ResumeOutcome::AlreadyRunning => "Game is already running",
            ResumeOutcome::NotStarted => "Cannot resume, game was never started",
        }
    }
}

/// Point-in-time view of a [`GameState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub status: GameStatus,
    pub peer_address: Option<String>,
    pub interval_ms: Option<u64>,
    pub pending_pings: usize,
    pub pending_wait_ms: Option<f64>,
}

/// Ping/pong state machine of one instance.
///
/// `GameState` does no I/O and owns no tasks. Every transition takes the
/// current instant and reports which cycles the caller has to cancel or
/// re-arm, so the timer side can be driven from the outcome alone.
#[derive(Debug)]
pub struct GameState {
    peer: Option<Url>,
    interval: Option<Duration>,
    status: GameStatus,
    cycles: BTreeMap<u64, Countdown>,
    next_cycle: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            peer: None,
            interval: None,
            status: GameStatus::Idle,
            cycles: BTreeMap::new(),
            next_cycle: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn peer(&self) -> Option<&Url> {
        self.peer.as_ref()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn pending_cycles(&self) -> usize {
        self.cycles.len()
    }

    /// Configure the peer and interval and start running.
    ///
    /// Any cycle still in flight is dropped; the returned ids are the cycles
    /// whose timers must be cancelled.
    pub fn start(&mut self, peer: Url, interval_ms: u64) -> Result<Vec<u64>, GameError> {
        if interval_ms == 0 {
            return Err(GameError::InvalidInterval(interval_ms.to_string()));
        }
        validate_peer(&peer)?;

        self.peer = Some(peer);
        self.interval = Some(Duration::from_millis(interval_ms));
        self.status = GameStatus::Running;
        Ok(self.drain_cycles())
    }

    pub fn pause(&mut self, now: Instant) -> PauseOutcome {
        if self.status != GameStatus::Running {
            return PauseOutcome::AlreadyPaused;
        }

        self.status = GameStatus::Paused;
        let mut suspended = Vec::with_capacity(self.cycles.len());
        for (id, countdown) in self.cycles.iter_mut() {
            countdown.suspend(now);
            suspended.push(*id);
        }
        PauseOutcome::Paused { suspended }
    }

    pub fn resume(&mut self, now: Instant) -> ResumeOutcome {
        match self.status {
            GameStatus::Running => ResumeOutcome::AlreadyRunning,
            GameStatus::Idle => ResumeOutcome::NotStarted,
            GameStatus::Paused => {
                self.status = GameStatus::Running;
                let rearmed = self
                    .cycles
                    .iter_mut()
                    .map(|(id, countdown)| (*id, countdown.resume(now)))
                    .collect();
                ResumeOutcome::Resumed { rearmed }
            }
        }
    }

    /// Return to `Idle`, forgetting the configuration. Returns the cycles to cancel.
    pub fn stop(&mut self) -> Vec<u64> {
        self.status = GameStatus::Idle;
        self.peer = None;
        self.interval = None;
        self.drain_cycles()
    }

    /// Handle an inbound ping, arming a new cycle when running.
    pub fn accept_ping(&mut self, now: Instant) -> PingOutcome {
        let interval = match (self.status, self.interval) {
            (GameStatus::Running, Some(interval)) if self.peer.is_some() => interval,
            _ => return PingOutcome::NotRunning,
        };

        let cycle = self.next_cycle;
        self.next_cycle += 1;
        let countdown = Countdown::arm(now, interval);
        self.cycles.insert(cycle, countdown);

        PingOutcome::Pong {
            cycle,
            deadline: now + interval,
        }
    }

    /// Complete a cycle whose timer has fired.
    ///
    /// Yields the peer to ping only if the game is running and the cycle is
    /// still armed and due; a paused or cancelled cycle is left untouched.
    pub fn fire(&mut self, cycle: u64, now: Instant) -> Option<Url> {
        if self.status != GameStatus::Running {
            return None;
        }
        match self.cycles.get(&cycle) {
            Some(countdown) if countdown.is_due(now) => {
                self.cycles.remove(&cycle);
                self.peer.clone()
            }
            _ => None,
        }
    }

    pub fn snapshot(&self, now: Instant) -> StateSnapshot {
        let pending_wait_ms = self
            .cycles
            .values()
            .map(|countdown| countdown.remaining(now))
            .min()
            .map(|remaining| remaining.as_micros() as f64 / 1000.0);

        StateSnapshot {
            status: self.status,
            peer_address: self.peer.as_ref().map(|url| url.to_string()),
            interval_ms: self.interval.map(|interval| interval.as_millis() as u64),
            pending_pings: self.cycles.len(),
            pending_wait_ms,
        }
    }

    fn drain_cycles(&mut self) -> Vec<u64> {
        let ids = self.cycles.keys().copied().collect();
        self.cycles.clear();
        ids
    }
}

fn validate_peer(peer: &Url) -> Result<(), GameError> {
    let invalid = |reason: &str| GameError::InvalidPeerAddress {
        address: peer.to_string(),
        reason: reason.to_string(),
    };

    match peer.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
    if peer.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// Parse and validate the raw `peerAddress` query value.
pub fn parse_peer_address(raw: &str) -> Result<Url, GameError> {
    let url = Url::parse(raw).map_err(|e| GameError::InvalidPeerAddress {
        address: raw.to_string(),
        reason: e.to_string(),
    })?;
    validate_peer(&url)?;
    Ok(url)
}

/// Parse the raw `intervalMs` query value; zero and negatives are rejected.
pub fn parse_interval_ms(raw: &str) -> Result<u64, GameError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(GameError::InvalidInterval(raw.to_string())),
    }
}
