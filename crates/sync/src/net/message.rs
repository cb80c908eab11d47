use rkyv::rancor;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::CodecError;

/// Wrapped tick as carried on the wire.
pub type Tick = u8;

/// Ping timestamps are milliseconds modulo this window.
pub const PING_WINDOW_MS: u64 = 10_000;

/// Dynamic payload value for level data, player data and event payloads.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Event as serialized for a peer.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EventRecord {
    pub tag: u16,
    pub payload: Vec<Value>,
}

/// Where a server-originated game or player event applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum EventScope {
    Game,
    Player(u16),
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ScopedEvent {
    pub scope: EventScope,
    pub event: EventRecord,
}

/// One entity's slice of a tick broadcast. `state` is absent while the
/// entity is hidden from the observer.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct EntityUpdate {
    pub id: u16,
    pub visible: bool,
    pub state: Option<[f32; 4]>,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerMessage {
    GameSetup {
        tick: Tick,
        config: GameConfig,
        level: Vec<Value>,
    },
    PlayerJoin {
        id: u16,
        name: String,
        is_private: bool,
        is_spectator: bool,
        data: Vec<Value>,
    },
    PlayerLeave {
        id: u16,
    },
    PlayerSpectate {
        id: u16,
        is_spectator: bool,
    },
    EntityAdd {
        id: u16,
        kind: u16,
        owner: Option<u16>,
        state: [f32; 4],
    },
    EntityRemove {
        id: u16,
    },
    EntitySetPlayer {
        entity: u16,
        player: Option<u16>,
    },
    GameTick {
        confirmed_tick: Tick,
        entities: Vec<EntityUpdate>,
        round_trip: i32,
    },
    GameEvents {
        tick: Tick,
        events: Vec<ScopedEvent>,
    },
    Ping {
        timestamp: u16,
    },
    JoinRejected {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientMessage {
    Join {
        name: String,
    },
    State {
        tick: Tick,
        delta: [f32; 4],
    },
    Event {
        tick: Tick,
        target: u8,
        event: EventRecord,
    },
    Pong {
        timestamp: u16,
    },
}

macro_rules! impl_codec {
    ($($message:ty),+) => {$(
        impl $message {
            pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
                rkyv::to_bytes::<rancor::Error>(self)
                    .map(|aligned| aligned.into_vec())
                    .map_err(CodecError::Serialize)
            }

            /// Validates and decodes a frame. The bytes are copied into an
            /// aligned buffer first since transports hand out arbitrary slices.
            pub fn deserialize(data: &[u8]) -> Result<Self, CodecError> {
                let mut aligned = AlignedVec::<16>::with_capacity(data.len());
                aligned.extend_from_slice(data);
                rkyv::from_bytes::<Self, rancor::Error>(&aligned)
                    .map_err(CodecError::Deserialize)
            }
        }
    )+};
}

impl_codec!(ServerMessage, ClientMessage);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_broadcast_survives_the_wire() {
        let message = ServerMessage::GameTick {
            confirmed_tick: 255,
            entities: vec![
                EntityUpdate {
                    id: 3,
                    visible: true,
                    state: Some([1.5, -2.0, 0.25, 3.0]),
                    events: vec![EventRecord {
                        tag: 7,
                        payload: vec![Value::from(4.0), Value::from("hit")],
                    }],
                },
                EntityUpdate {
                    id: 4,
                    visible: false,
                    state: None,
                    events: Vec::new(),
                },
            ],
            round_trip: -1,
        };

        let bytes = message.serialize().unwrap();
        assert_eq!(ServerMessage::deserialize(&bytes).unwrap(), message);
    }

    #[test]
    fn setup_carries_config() {
        let config = GameConfig {
            max_players: 2,
            ..Default::default()
        };
        let message = ServerMessage::GameSetup {
            tick: 17,
            config,
            level: vec![Value::from(50.0)],
        };
        let decoded = ServerMessage::deserialize(&message.serialize().unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ClientMessage::deserialize(&[0xde, 0xad, 0xbe, 0xef, 1, 2, 3]).is_err());
        assert!(ClientMessage::deserialize(&[]).is_err());
    }

    #[test]
    fn decodes_from_unaligned_slices() {
        let message = ClientMessage::State {
            tick: 9,
            delta: [0.1, 0.2, 0.0, 1.0],
        };
        let bytes = message.serialize().unwrap();
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        assert_eq!(ClientMessage::deserialize(&shifted[1..]).unwrap(), message);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(Value::from(2.5f32).as_f64(), Some(2.5));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from("x").as_f64(), None);
    }
}
