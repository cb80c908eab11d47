use std::fmt;

use crate::config::GameConfig;
use crate::world::{Entity, InputSample, Player, State};

/// Wire tag identifying an entity kind.
pub type EntityTag = u16;

/// Game-specific behavior of an entity type. Kinds are stateless and shared
/// through the [`Protocol`](crate::protocol::Protocol); per-entity data lives
/// on the [`Entity`].
pub trait EntityKind: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Turns one input sample into a per-tick velocity on the client.
    fn apply_input(&self, _velocity: &mut State, _input: &InputSample, _config: &GameConfig) {}

    fn is_visible_to(&self, _entity: &Entity, _observer: &Player) -> bool {
        true
    }

    /// Friends receive the private state.
    fn is_friend_of(&self, entity: &Entity, observer: &Player) -> bool {
        observer.id().is_some() && entity.owner() == observer.id()
    }

    fn public_state(&self, entity: &Entity) -> State {
        *entity.state()
    }

    fn private_state(&self, entity: &Entity) -> State {
        *entity.state()
    }
}

/// Kind registered at tag 0 on every protocol. It ignores input.
#[derive(Debug, Default)]
pub struct BasicEntity;

impl BasicEntity {
    pub const TAG: EntityTag = 0;
}

impl EntityKind for BasicEntity {
    fn name(&self) -> &'static str {
        "basic"
    }
}
