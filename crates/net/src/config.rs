//! Relay configuration

use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::net::UdpSocket;

/// Port the host listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 5000;

/// Players in a full room, host included
pub const MAX_PLAYERS: usize = 8;

/// Seconds between the host pressing start and the match beginning
pub const START_DELAY_SECONDS: f64 = 2.0;

/// How often a client pushes its board to the host
pub const BOARD_SEND_INTERVAL_MS: u64 = 200;

/// How long `join` waits for a possible `reject` after connecting
pub const REJECT_WAIT_MS: u64 = 1000;

/// How long a client waits for `welcome` before assuming the first peer id
pub const WELCOME_WAIT_MS: u64 = 3000;

/// A single frame write taking longer than this drops the connection
pub const WRITE_TIMEOUT_MS: u64 = 2000;

/// How long a closing connection keeps trying to hand over queued frames
pub const CLOSE_GRACE_MS: u64 = 200;

/// Address other machines on the LAN can reach this host at.
///
/// Asks the OS which interface would route outward; connecting a UDP socket
/// sends no packet. Falls back to loopback when there is no route.
pub async fn lan_address() -> IpAddr {
    async fn probe() -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect("8.8.8.8:80").await?;
        Ok(socket.local_addr()?.ip())
    }

    match probe().await {
        Ok(ip) if !ip.is_unspecified() => ip,
        _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_host: String,
    pub port: u16,
    /// Peers accepted besides the host
    pub max_clients: usize,
    /// Accept timeout, after which the accept loop re-checks for shutdown
    pub accept_poll_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: MAX_PLAYERS - 1,
            accept_poll_ms: 500,
        }
    }
}

impl RelayConfig {
    /// Create from environment variables, falling back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_host = env::var("LAN_TETRIS_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.bind_host);

        let port = env::var("LAN_TETRIS_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let max_clients = env::var("LAN_TETRIS_MAX_CLIENTS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_clients);

        Self {
            bind_host,
            port,
            max_clients,
            accept_poll_ms: defaults.accept_poll_ms,
        }
    }

    /// `host:port` string handed to the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms.max(1))
    }
}
