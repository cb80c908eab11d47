use std::fmt;

use crate::net::Value;
use crate::world::{Entity, State};

/// Static world geometry. Collision runs identically on both peers so the
/// client's prediction matches the server's integration.
pub trait Level: fmt::Debug {
    /// Adjusts `velocity` so that applying it to `entity` stays legal.
    fn apply_entity_collision(&self, entity: &Entity, velocity: &mut State);

    /// Level data sent to clients on join.
    fn serialize(&self) -> Vec<Value> {
        Vec::new()
    }

    /// Rebuilds the level from server data on the client.
    fn restore(&mut self, _data: &[Value]) {}
}

/// Level with no obstacles.
#[derive(Debug, Default)]
pub struct OpenLevel;

impl Level for OpenLevel {
    fn apply_entity_collision(&self, _entity: &Entity, _velocity: &mut State) {}
}
