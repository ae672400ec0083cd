// src/game/engine.rs
use super::state::{
    GameError, GameState, GameStatus, PauseOutcome, PingOutcome, ResumeOutcome, StateSnapshot,
};
use crate::metrics::MetricsCollector;
use crate::peer::PeerClient;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// One game instance: the state machine plus the timers of its in-flight
/// cycles. Both live behind the same lock so a transition and the timer
/// bookkeeping it implies are applied together.
pub struct Game {
    instance_id: String,
    inner: Mutex<Inner>,
    peer_client: Arc<dyn PeerClient>,
    metrics: Arc<MetricsCollector>,
}

struct Inner {
    state: GameState,
    timers: HashMap<u64, JoinHandle<()>>,
    last_ping_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub instance_id: String,
    #[serde(flatten)]
    pub state: StateSnapshot,
    pub pings_received: u64,
    pub pings_sent: u64,
    pub failed_deliveries: u64,
    pub last_ping_at: Option<String>,
}

impl Game {
    pub fn new(peer_client: Arc<dyn PeerClient>, metrics: Arc<MetricsCollector>) -> Self {
        let game = Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            inner: Mutex::new(Inner {
                state: GameState::new(),
                timers: HashMap::new(),
                last_ping_at: None,
            }),
            peer_client,
            metrics,
        };
        game.metrics.update_game_state(GameStatus::Idle, 0);
        game
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub async fn start(self: &Arc<Self>, peer: Url, interval_ms: u64) -> Result<(), GameError> {
        let mut inner = self.inner.lock().await;
        let cancelled = inner.state.start(peer.clone(), interval_ms)?;
        cancel_timers(&mut inner, &cancelled);

        info!(
            instance = %self.instance_id,
            "Game started. Pinging {} every {} ms", peer, interval_ms
        );
        if !cancelled.is_empty() {
            debug!("Dropped {} pending pings on restart", cancelled.len());
        }
        self.publish(&inner);
        Ok(())
    }

    pub async fn pause(&self) -> PauseOutcome {
        let mut inner = self.inner.lock().await;
        let outcome = inner.state.pause(Instant::now());

        match &outcome {
            PauseOutcome::Paused { suspended } => {
                cancel_timers(&mut inner, suspended);
                info!(
                    instance = %self.instance_id,
                    "Game paused with {} pending pings", suspended.len()
                );
            }
            PauseOutcome::AlreadyPaused => debug!("Pause requested but game is not running"),
        }
        self.publish(&inner);
        outcome
    }

    pub async fn resume(self: &Arc<Self>) -> ResumeOutcome {
        let mut inner = self.inner.lock().await;
        let outcome = inner.state.resume(Instant::now());

        match &outcome {
            ResumeOutcome::Resumed { rearmed } => {
                for (cycle, deadline) in rearmed {
                    self.arm_timer(&mut inner, *cycle, *deadline);
                }
                info!(
                    instance = %self.instance_id,
                    "Game resumed with {} pending pings", rearmed.len()
                );
            }
            ResumeOutcome::AlreadyRunning => debug!("Resume requested but game is already running"),
            ResumeOutcome::NotStarted => warn!("Cannot resume, game was never started"),
        }
        self.publish(&inner);
        outcome
    }

    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let cancelled = inner.state.stop();
        cancel_timers(&mut inner, &cancelled);

        info!(instance = %self.instance_id, "Game stopped");
        self.publish(&inner);
    }

    /// Answer an inbound ping. When running, one outbound ping is scheduled
    /// for when the interval has elapsed; the caller is answered right away.
    pub async fn ping(self: &Arc<Self>) -> PingOutcome {
        let mut inner = self.inner.lock().await;
        inner.last_ping_at = Some(Utc::now());
        let outcome = inner.state.accept_ping(Instant::now());

        match outcome {
            PingOutcome::Pong { cycle, deadline } => {
                info!(instance = %self.instance_id, cycle, "Received ping! Sending pong...");
                self.arm_timer(&mut inner, cycle, deadline);
            }
            PingOutcome::NotRunning => debug!("Ignoring ping, game is paused or not started"),
        }
        self.metrics
            .record_ping_received(matches!(outcome, PingOutcome::Pong { .. }));
        self.publish(&inner);
        outcome
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        let inner = self.inner.lock().await;
        GameSnapshot {
            instance_id: self.instance_id.clone(),
            state: inner.state.snapshot(Instant::now()),
            pings_received: self.metrics.pings_received(true) + self.metrics.pings_received(false),
            pings_sent: self.metrics.pings_sent(true),
            failed_deliveries: self.metrics.pings_sent(false),
            last_ping_at: inner
                .last_ping_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    fn arm_timer(self: &Arc<Self>, inner: &mut Inner, cycle: u64, deadline: Instant) {
        let game = Arc::clone(self);
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            game.complete_cycle(cycle).await;
        });

        if let Some(previous) = inner.timers.insert(cycle, handle) {
            previous.abort();
        }
    }

    async fn complete_cycle(&self, cycle: u64) {
        let peer = {
            let mut inner = self.inner.lock().await;
            let peer = inner.state.fire(cycle, Instant::now());
            if peer.is_some() {
                inner.timers.remove(&cycle);
            }
            self.publish(&inner);
            peer
        };

        let Some(peer) = peer else {
            debug!(cycle, "Cycle is no longer armed, skipping ping");
            return;
        };

        // Failures stall the exchange until someone pings or restarts us.
        match self.peer_client.send_ping(&peer).await {
            Ok(()) => {
                debug!(cycle, "Ping delivered to {}", peer);
                self.metrics.record_ping_sent(true);
            }
            Err(e) => {
                warn!(cycle, "Failed to ping other instance: {}", e);
                self.metrics.record_ping_sent(false);
            }
        }
    }

    fn publish(&self, inner: &Inner) {
        self.metrics
            .update_game_state(inner.state.status(), inner.state.pending_cycles());
    }
}

fn cancel_timers(inner: &mut Inner, cycles: &[u64]) {
    for cycle in cycles {
        if let Some(handle) = inner.timers.remove(cycle) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use crate::peer::PeerError;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Default)]
    struct RecordingPeer {
        sent: std::sync::Mutex<Vec<(Url, Instant)>>,
        fail: bool,
    }

    impl RecordingPeer {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(Url, Instant)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PeerClient for RecordingPeer {
        async fn send_ping(&self, peer: &Url) -> Result<(), PeerError> {
            self.sent.lock().unwrap().push((peer.clone(), Instant::now()));
            if self.fail {
                return Err(PeerError::Rejected {
                    peer: peer.to_string(),
                    status: 503,
                });
            }
            Ok(())
        }
    }

    fn peer_b() -> Url {
        Url::parse("http://b").unwrap()
    }

    fn game_with(peer: Arc<RecordingPeer>) -> Arc<Game> {
        let registry = MetricsRegistry::new().unwrap();
        Arc::new(Game::new(peer, registry.collector()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_schedules_single_outbound_ping() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();

        let started = Instant::now();
        assert_eq!(game.ping().await.message(), "pong");
        assert!(peer.sent().is_empty());

        sleep(Duration::from_millis(999)).await;
        assert!(peer.sent().is_empty());

        sleep(Duration::from_millis(5000)).await;
        let sent = peer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, peer_b());
        assert!(sent[0].1 - started >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_when_not_started_sends_nothing() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());

        let outcome = game.ping().await;
        sleep(Duration::from_secs(10)).await;

        assert_eq!(outcome, PingOutcome::NotRunning);
        assert!(peer.sent().is_empty());
        assert_eq!(game.snapshot().await.pings_received, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_keeps_total_wait() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();

        let started = Instant::now();
        game.ping().await;
        sleep(Duration::from_millis(400)).await;
        assert!(matches!(game.pause().await, PauseOutcome::Paused { .. }));

        sleep(Duration::from_millis(5000)).await;
        assert!(peer.sent().is_empty());
        assert_eq!(game.snapshot().await.state.pending_wait_ms, Some(600.0));

        assert!(matches!(game.resume().await, ResumeOutcome::Resumed { .. }));
        sleep(Duration::from_millis(599)).await;
        assert!(peer.sent().is_empty());

        sleep(Duration::from_millis(10)).await;
        let sent = peer.sent();
        assert_eq!(sent.len(), 1);
        // 400 ms before the pause + 5000 ms paused + 600 ms after resuming
        let waited = sent[0].1 - started;
        assert!(waited >= Duration::from_millis(6000));
        assert!(waited < Duration::from_millis(6010));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_pause_and_resume_are_reported() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();
        game.ping().await;

        sleep(Duration::from_millis(250)).await;
        game.pause().await;
        let pending = game.snapshot().await.state.pending_wait_ms;

        sleep(Duration::from_millis(100)).await;
        assert_eq!(game.pause().await, PauseOutcome::AlreadyPaused);
        assert_eq!(game.snapshot().await.state.pending_wait_ms, pending);

        game.resume().await;
        assert_eq!(game.resume().await, ResumeOutcome::AlreadyRunning);
        assert_eq!(game.snapshot().await.state.pending_wait_ms, Some(750.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_ping() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();
        game.ping().await;

        sleep(Duration::from_millis(500)).await;
        game.stop().await;
        sleep(Duration::from_secs(5)).await;

        assert!(peer.sent().is_empty());
        assert_eq!(game.ping().await, PingOutcome::NotRunning);
        assert_eq!(game.resume().await, ResumeOutcome::NotStarted);

        let snapshot = game.snapshot().await;
        assert_eq!(snapshot.state.status, GameStatus::Idle);
        assert_eq!(snapshot.state.peer_address, None);
        assert_eq!(snapshot.state.pending_pings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_keeps_running() {
        let peer = Arc::new(RecordingPeer::failing());
        let game = game_with(peer.clone());
        game.start(peer_b(), 100).await.unwrap();
        game.ping().await;

        sleep(Duration::from_secs(2)).await;

        let snapshot = game.snapshot().await;
        assert_eq!(peer.sent().len(), 1);
        assert_eq!(snapshot.failed_deliveries, 1);
        assert_eq!(snapshot.pings_sent, 0);
        assert_eq!(snapshot.state.status, GameStatus::Running);
        assert_eq!(snapshot.state.pending_pings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_ping_schedules_its_own_cycle() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();

        game.ping().await;
        sleep(Duration::from_millis(300)).await;
        game.ping().await;
        assert_eq!(game.snapshot().await.state.pending_pings, 2);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(peer.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_drops_pending_cycle() {
        let peer = Arc::new(RecordingPeer::default());
        let game = game_with(peer.clone());
        game.start(peer_b(), 1000).await.unwrap();
        game.ping().await;

        sleep(Duration::from_millis(500)).await;
        game.start(Url::parse("http://c").unwrap(), 200).await.unwrap();
        sleep(Duration::from_secs(3)).await;

        assert!(peer.sent().is_empty());
        let snapshot = game.snapshot().await;
        assert_eq!(snapshot.state.interval_ms, Some(200));
        assert_eq!(snapshot.state.peer_address.as_deref(), Some("http://c/"));
    }
}
