use rkyv::rancor;

use crate::event::EventTag;
use crate::net::Tick;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: usize },
    #[error("slot {0} is already occupied")]
    SlotOccupied(usize),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("stale or forged tick {received} (last confirmed {last:?})")]
    StaleOrForgedTick { last: Option<Tick>, received: Tick },
    #[error("unknown event type {0}")]
    UnknownEventType(EventTag),
    #[error("unknown entity type {0}")]
    UnknownEntityType(u16),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SyncError {
    pub fn not_found(what: &'static str, id: impl Into<usize>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidMessage(message.into())
    }

    /// Whether the offending connection must be closed. Every other error
    /// drops the message and keeps the connection open.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            Self::InvalidMessage(_) | Self::Codec(_) | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_policy() {
        assert!(SyncError::invalid("garbage").closes_connection());
        assert!(SyncError::Transport(TransportError::Closed).closes_connection());
        assert!(!SyncError::CapacityExceeded { capacity: 8 }.closes_connection());
        assert!(
            !SyncError::StaleOrForgedTick {
                last: Some(11),
                received: 12
            }
            .closes_connection()
        );
        assert!(!SyncError::UnknownEventType(42).closes_connection());
    }

    #[test]
    fn messages_name_the_missing_item() {
        let err = SyncError::not_found("entity", 7u16);
        assert_eq!(err.to_string(), "entity 7 not found");
    }
}
