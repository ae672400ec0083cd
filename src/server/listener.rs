// ────────────────────────────────
// src/server/listener.rs
// Encapsulates low‑level TCP binding for the game server and port discovery
// for the controller.
// ────────────────────────────────
use anyhow::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    Ok(listener)
}

/// Find `count` distinct free ports on `host`.
///
/// All probe sockets stay open until every port is known, so the same port
/// is never handed out twice. Another process may still grab a port between
/// the probe closing and the game server binding it.
pub fn find_free_ports(host: &str, count: usize) -> std::io::Result<Vec<u16>> {
    let mut probes = Vec::with_capacity(count);
    for _ in 0..count {
        probes.push(std::net::TcpListener::bind((host, 0))?);
    }

    probes
        .iter()
        .map(|probe| probe.local_addr().map(|addr| addr.port()))
        .collect()
}
