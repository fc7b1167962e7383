//! Networking for LAN matches
//!
//! The host runs a [`RelayHandle`] next to its own game session; every other
//! player joins it with a [`ClientPeer`]. All traffic is newline-delimited JSON
//! over TCP (see [`protocol`]). The host is authoritative only for routing and
//! for deciding when the match ends: boards reported by clients are relayed
//! as-is, without validation.
//!
//! # Module Structure
//!
//! - [`protocol`]: tagged message enum and the roster map
//! - [`transport`]: framed connection with its reader and writer tasks
//! - [`relay`]: host actor owning all peer connections
//! - [`client`]: joining, waiting for the assigned id, mirroring match state
//! - [`config`]: relay settings and timing constants
//! - [`error`]: typed errors for connection setup and relay access

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod transport;

pub use client::{ClientPeer, ClientView};
pub use config::RelayConfig;
pub use error::NetError;
pub use protocol::{EndPacket, Message, PlayerId, RejectReason, Roster, HOST_ID};
pub use relay::{RelayHandle, TickReport};
pub use transport::Connection;
