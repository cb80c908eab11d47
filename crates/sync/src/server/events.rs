use std::fmt;

use crate::world::PlayerId;

/// Transport-level handle the server assigns to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Things the embedding application may want to react to, drained with
/// [`Server::drain_events`](super::Server::drain_events).
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected {
        connection: ConnectionId,
        address: String,
    },
    PlayerJoined {
        connection: ConnectionId,
        player: PlayerId,
        name: String,
    },
    JoinRejected {
        connection: ConnectionId,
        reason: String,
    },
    PlayerLeft {
        connection: ConnectionId,
        player: PlayerId,
        name: String,
    },
    Disconnected {
        connection: ConnectionId,
        reason: CloseReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    Remote(String),
    InvalidMessage(String),
    SendFailed,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &str {
        match self {
            CloseReason::Remote(reason) => reason,
            CloseReason::InvalidMessage(_) => "invalid message",
            CloseReason::SendFailed => "send failed",
            CloseReason::Shutdown => "server shutting down",
        }
    }
}
