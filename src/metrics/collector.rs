// src/metrics/collector.rs
use crate::game::GameStatus;
use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Per-instance registry. Each game owns its own so several instances can
/// share a process (as the integration tests do).
pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub pings_received_total: IntCounterVec,
    pub pings_sent_total: IntCounterVec,
    pub game_state: IntGauge,
    pub pending_pings: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let pings_received_total = IntCounterVec::new(
            Opts::new("pong_pings_received_total", "Inbound pings by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(pings_received_total.clone()))?;

        let pings_sent_total = IntCounterVec::new(
            Opts::new("pong_pings_sent_total", "Outbound pings by delivery result"),
            &["result"],
        )?;
        registry.register(Box::new(pings_sent_total.clone()))?;

        let game_state = IntGauge::new(
            "pong_game_state",
            "Game state (0 = idle, 1 = running, 2 = paused)",
        )?;
        registry.register(Box::new(game_state.clone()))?;

        let pending_pings = IntGauge::new(
            "pong_pending_pings",
            "Outbound pings waiting for their interval to elapse",
        )?;
        registry.register(Box::new(pending_pings.clone()))?;

        Ok(Self {
            pings_received_total,
            pings_sent_total,
            game_state,
            pending_pings,
        })
    }

    pub fn record_ping_received(&self, answered: bool) {
        let outcome = if answered { "pong" } else { "ignored" };
        self.pings_received_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_ping_sent(&self, success: bool) {
        let result = if success { "success" } else { "failure" };
        self.pings_sent_total.with_label_values(&[result]).inc();
    }

    pub fn update_game_state(&self, status: GameStatus, pending: usize) {
        self.game_state.set(status.as_gauge());
        self.pending_pings.set(pending as i64);
    }

    pub fn pings_received(&self, answered: bool) -> u64 {
        let outcome = if answered { "pong" } else { "ignored" };
        self.pings_received_total.with_label_values(&[outcome]).get()
    }

    pub fn pings_sent(&self, success: bool) -> u64 {
        let result = if success { "success" } else { "failure" };
        self.pings_sent_total.with_label_values(&[result]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_counters() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.record_ping_received(true);
        metrics.record_ping_received(true);
        metrics.record_ping_sent(false);
        metrics.update_game_state(GameStatus::Paused, 1);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(r#"pong_pings_received_total{outcome="pong"} 2"#));
        assert!(text.contains(r#"pong_pings_sent_total{result="failure"} 1"#));
        assert!(text.contains("pong_game_state 2"));
        assert!(text.contains("pong_pending_pings 1"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = MetricsRegistry::new().unwrap();
        let second = MetricsRegistry::new().unwrap();

        first.collector().record_ping_received(false);

        assert_eq!(first.collector().pings_received(false), 1);
        assert_eq!(second.collector().pings_received(false), 0);
    }
}
