use glam::Vec3;

use crate::net::Value;
use crate::simulation::Level;
use crate::world::{Entity, State};

/// Flat box-shaped arena. Entities are held inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaLevel {
    min: Vec3,
    max: Vec3,
}

impl Default for ArenaLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaLevel {
    const HALF_SIZE: f32 = 50.0;
    const CEILING: f32 = 10.0;

    pub fn new() -> Self {
        Self::with_bounds(
            Vec3::new(-Self::HALF_SIZE, -Self::HALF_SIZE, 0.0),
            Vec3::new(Self::HALF_SIZE, Self::HALF_SIZE, Self::CEILING),
        )
    }

    pub fn with_bounds(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

impl Level for ArenaLevel {
    fn apply_entity_collision(&self, entity: &Entity, velocity: &mut State) {
        let from = entity.state().position;
        let to = (from + velocity.position).clamp(self.min, self.max);
        velocity.position = to - from;
    }

    fn serialize(&self) -> Vec<Value> {
        self.min
            .to_array()
            .into_iter()
            .chain(self.max.to_array())
            .map(Value::from)
            .collect()
    }

    /// Anything other than six numbers falls back to the default arena.
    fn restore(&mut self, data: &[Value]) {
        let numbers: Option<Vec<f32>> = data
            .iter()
            .map(|value| value.as_f64().map(|n| n as f32))
            .collect();

        *self = match numbers.as_deref() {
            Some(&[ax, ay, az, bx, by, bz]) => {
                Self::with_bounds(Vec3::new(ax, ay, az), Vec3::new(bx, by, bz))
            }
            _ => Self::new(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_at(x: f32, y: f32) -> Entity {
        Entity::new(0, State::new(x, y, 0.0, 0.0), 8)
    }

    #[test]
    fn velocity_inside_bounds_is_untouched() {
        let level = ArenaLevel::new();
        let mut velocity = State::new(1.0, -1.0, 0.0, 0.3);
        level.apply_entity_collision(&entity_at(0.0, 0.0), &mut velocity);
        assert_eq!(velocity, State::new(1.0, -1.0, 0.0, 0.3));
    }

    #[test]
    fn velocity_is_clipped_at_the_wall() {
        let level = ArenaLevel::new();
        let mut velocity = State::new(3.0, 0.0, -2.0, 0.0);
        level.apply_entity_collision(&entity_at(49.0, 0.0), &mut velocity);
        assert_eq!(velocity.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn bounds_survive_the_trip_to_the_client() {
        let server = ArenaLevel::with_bounds(Vec3::new(5.0, 5.0, 1.0), Vec3::new(-5.0, -5.0, 0.0));
        let mut client = ArenaLevel::new();
        client.restore(&server.serialize());
        assert_eq!(client, server);
        assert!(client.contains(Vec3::new(4.0, -4.0, 0.5)));
        assert!(!client.contains(Vec3::new(6.0, 0.0, 0.5)));
    }

    #[test]
    fn malformed_level_data_restores_default() {
        let mut level = ArenaLevel::with_bounds(Vec3::ZERO, Vec3::ONE);
        level.restore(&[Value::from("wall"), Value::from(1.0)]);
        assert_eq!(level, ArenaLevel::new());
    }
}
