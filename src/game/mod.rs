// src/game/mod.rs
mod countdown;
mod engine;
mod state;

pub use countdown::Countdown;
pub use engine::{Game, GameSnapshot};
pub use state::{
    parse_interval_ms, parse_peer_address, GameError, GameState, GameStatus, PauseOutcome,
    PingOutcome, ResumeOutcome, StateSnapshot,
};
