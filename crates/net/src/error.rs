//! Error types for the network layer.
//!
//! Faults on an established connection never surface here: the transport marks
//! the connection dead and the relay carries on. These errors cover setting a
//! connection or the relay up, and talking to a relay that is gone.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::RejectReason;

#[derive(Debug, Error)]
pub enum NetError {
    /// I/O error on a socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host did not accept the connection in time.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    /// The host answered with a `reject` frame.
    #[error("rejected by host: {0}")]
    Rejected(RejectReason),

    /// The relay task has shut down.
    #[error("relay is not running")]
    RelayClosed,

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_names_reason() {
        let err = NetError::Rejected(RejectReason::RoomFull);
        assert_eq!(err.to_string(), "rejected by host: room_full");
    }

    #[test]
    fn test_io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: NetError = io.into();
        assert!(matches!(err, NetError::Io(_)));
    }
}
