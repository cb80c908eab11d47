use crate::net::Tick;
use crate::world::Entity;

/// Produces the local player's input once per received tick.
pub trait InputSource {
    /// Raw input for `tick`, or `None` when idle.
    fn sample(&mut self, entity: &Entity, tick: Tick) -> Option<Vec<f32>>;
}

/// Input source for observers that never move.
#[derive(Debug, Default)]
pub struct Idle;

impl InputSource for Idle {
    fn sample(&mut self, _entity: &Entity, _tick: Tick) -> Option<Vec<f32>> {
        None
    }
}

impl<F> InputSource for F
where
    F: FnMut(&Entity, Tick) -> Option<Vec<f32>>,
{
    fn sample(&mut self, entity: &Entity, tick: Tick) -> Option<Vec<f32>> {
        self(entity, tick)
    }
}
