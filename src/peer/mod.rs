// src/peer/mod.rs
mod client;

pub use client::{HttpPeerClient, PeerClient, PeerError};
