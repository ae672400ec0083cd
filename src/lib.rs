// src/lib.rs
pub mod config;
pub mod controller;
pub mod game;
pub mod logging;
pub mod metrics;
pub mod peer;
pub mod server;
