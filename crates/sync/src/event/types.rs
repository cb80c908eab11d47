use std::fmt;

use crate::error::SyncError;
use crate::net::Value;
use crate::simulation::SimulationContext;
use crate::world::{EntityId, Player, PlayerId};

/// Wire tag identifying an event kind. Both peers must register the same
/// tags.
pub type EventTag = u16;

/// Scope an event is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Game,
    Player,
    Entity,
}

impl EventTarget {
    pub fn from_wire(target: u8) -> Result<Self, SyncError> {
        match target {
            0 => Ok(Self::Game),
            1 => Ok(Self::Player),
            2 => Ok(Self::Entity),
            other => Err(SyncError::invalid(format!("event target {other} out of range"))),
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            Self::Game => 0,
            Self::Player => 1,
            Self::Entity => 2,
        }
    }
}

/// A discrete game event. The same event type runs on both peers; handlers
/// can branch on [`SimulationContext::role`].
///
/// `tick` is the full tick of the peer applying the event.
pub trait Event: fmt::Debug {
    fn tag(&self) -> EventTag;

    fn payload(&self) -> Vec<Value>;

    fn is_visible_to(&self, _observer: &Player) -> bool {
        true
    }

    fn apply_to_game(&self, _ctx: &mut SimulationContext, _tick: u64) -> Result<(), SyncError> {
        Ok(())
    }

    fn apply_to_player(
        &self,
        _ctx: &mut SimulationContext,
        _player: PlayerId,
        _tick: u64,
    ) -> Result<(), SyncError> {
        Ok(())
    }

    fn apply_to_entity(
        &self,
        _ctx: &mut SimulationContext,
        _entity: EntityId,
        _tick: u64,
    ) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Registration half of an event: a static tag and a payload decoder.
pub trait EventKind: Event + Sized + 'static {
    const TAG: EventTag;

    fn decode(payload: &[Value]) -> Result<Self, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_round_trip_through_wire() {
        for target in [EventTarget::Game, EventTarget::Player, EventTarget::Entity] {
            assert_eq!(EventTarget::from_wire(target.to_wire()).unwrap(), target);
        }
    }

    #[test]
    fn out_of_range_target_is_invalid() {
        assert!(matches!(
            EventTarget::from_wire(3),
            Err(SyncError::InvalidMessage(_))
        ));
    }
}
