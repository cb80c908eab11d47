use crate::event::Event;
use crate::net::Value;
use crate::world::{EntityId, PlayerId, Slotted};

pub const MAX_NAME_LENGTH: usize = 16;

/// A participant. Controls at most one entity at a time.
#[derive(Debug)]
pub struct Player {
    id: Option<PlayerId>,
    name: String,
    controlled: Option<EntityId>,
    is_local: bool,
    is_spectator: bool,
    round_trip: i32,
    data: Vec<Value>,
    events: Vec<Box<dyn Event>>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            controlled: None,
            is_local: false,
            is_spectator: false,
            round_trip: -1,
            data: Vec::new(),
            events: Vec::new(),
        }
    }

    /// The player this client is playing as.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            is_local: true,
            ..Self::new(name)
        }
    }

    pub fn id(&self) -> Option<PlayerId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// Spectators watch the game without playing in it.
    pub fn is_spectator(&self) -> bool {
        self.is_spectator
    }

    pub fn set_spectator(&mut self, spectator: bool) {
        self.is_spectator = spectator;
    }

    pub fn controlled_entity(&self) -> Option<EntityId> {
        self.controlled
    }

    pub(crate) fn set_controlled_entity(&mut self, entity: Option<EntityId>) {
        self.controlled = entity;
    }

    /// Smoothed round-trip estimate in milliseconds, `-1` while unknown.
    pub fn round_trip(&self) -> i32 {
        self.round_trip
    }

    /// Folds a new round-trip sample into the estimate.
    pub fn observe_round_trip(&mut self, sample_ms: f64) {
        self.round_trip = if self.round_trip < 0 {
            sample_ms.ceil() as i32
        } else {
            (self.round_trip as f64 * 0.5 + sample_ms * 0.5).ceil() as i32
        };
    }

    /// Opaque game data announced alongside the player.
    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<Value>) {
        self.data = data;
    }

    pub fn push_event(&mut self, event: Box<dyn Event>) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Box<dyn Event>> {
        std::mem::take(&mut self.events)
    }
}

impl Slotted for Player {
    type Id = PlayerId;

    fn set_slot(&mut self, id: Option<PlayerId>) {
        self.id = id;
    }
}

/// Names are 1 to 16 characters of ASCII letters, digits, `_` or `-`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
