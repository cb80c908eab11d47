use glam::Vec3;

use crate::config::GameConfig;

/// Position and heading of an entity. The same shape doubles as a velocity
/// (per-tick delta) and as the wire delta carried by client state updates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct State {
    pub position: Vec3,
    pub heading: f32,
}

impl State {
    pub const ZERO: Self = Self {
        position: Vec3::ZERO,
        heading: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32, heading: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            heading,
        }
    }

    pub fn from_array([x, y, z, heading]: [f32; 4]) -> Self {
        Self::new(x, y, z, heading)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.position.x, self.position.y, self.position.z, self.heading]
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.heading.is_finite()
    }

    /// Adopts another state's position. Heading stays local so the client
    /// keeps its own view direction when corrected.
    pub fn merge(&mut self, other: &State) {
        self.position = other.position;
    }

    /// Positional delta from `previous`, with the heading carried absolute.
    pub fn diff(&self, previous: &State) -> State {
        State {
            position: self.position - previous.position,
            heading: self.heading,
        }
    }

    pub fn update(&mut self, velocity: &State) {
        self.position += velocity.position;
        self.heading += velocity.heading;
    }

    pub fn reset(&mut self) {
        *self = Self::ZERO;
    }

    /// Turns a client-reported delta into a velocity the server can integrate.
    /// Horizontal speed is clamped to `max_player_speed`, vertical motion is
    /// passed through, and the heading change takes the short way round.
    pub fn velocity(&self, delta: &State, config: &GameConfig) -> State {
        let planar = delta.position.truncate();
        let speed = planar.length().min(config.max_player_speed);
        let direction = planar.y.atan2(planar.x);
        let turn = delta.heading - self.heading;

        State {
            position: Vec3::new(
                direction.cos() * speed,
                direction.sin() * speed,
                delta.position.z,
            ),
            heading: turn.sin().atan2(turn.cos()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn merge_keeps_heading() {
        let mut local = State::new(1.0, 2.0, 3.0, 0.5);
        local.merge(&State::new(9.0, 8.0, 7.0, 2.0));
        assert_eq!(local, State::new(9.0, 8.0, 7.0, 0.5));
    }

    #[test]
    fn diff_carries_absolute_heading() {
        let now = State::new(5.0, 1.0, 0.0, 1.25);
        let before = State::new(2.0, 3.0, 0.0, 0.75);
        assert_eq!(now.diff(&before), State::new(3.0, -2.0, 0.0, 1.25));
    }

    #[test]
    fn update_is_additive() {
        let mut state = State::new(1.0, 1.0, 1.0, 0.1);
        state.update(&State::new(0.5, -1.0, 2.0, 0.2));
        assert!(approx(state.position.x, 1.5));
        assert!(approx(state.position.y, 0.0));
        assert!(approx(state.position.z, 3.0));
        assert!(approx(state.heading, 0.3));
    }

    #[test]
    fn velocity_clamps_planar_speed() {
        let config = GameConfig::default();
        let state = State::ZERO;
        let v = state.velocity(&State::new(30.0, 40.0, 5.0, 0.0), &config);
        assert!(approx(v.position.truncate().length(), config.max_player_speed));
        assert!(approx(v.position.x, 6.0));
        assert!(approx(v.position.y, 8.0));
        assert!(approx(v.position.z, 5.0));
    }

    #[test]
    fn velocity_turns_the_short_way() {
        let config = GameConfig::default();
        let state = State::new(0.0, 0.0, 0.0, PI - 0.1);
        let v = state.velocity(&State::new(0.0, 0.0, 0.0, -PI + 0.1), &config);
        assert!(approx(v.heading, 0.2));
    }

    #[test]
    fn zero_delta_is_still() {
        let config = GameConfig::default();
        let state = State::new(3.0, 4.0, 0.0, 1.0);
        let v = state.velocity(&State::new(0.0, 0.0, 0.0, 1.0), &config);
        assert!(approx(v.position.length(), 0.0));
        assert!(approx(v.heading, 0.0));
    }

    proptest! {
        #[test]
        fn in_range_deltas_reproduce_motion(
            x in -5.0f32..5.0,
            y in -5.0f32..5.0,
            z in -5.0f32..5.0,
            heading in -3.0f32..3.0,
            turn in -3.0f32..3.0,
        ) {
            let config = GameConfig::default();
            let before = State::new(1.0, -2.0, 0.5, heading);
            let mut after = before;
            after.update(&State::new(x, y, z, turn));

            let mut server = before;
            server.update(&before.velocity(&after.diff(&before), &config));

            prop_assert!((server.position - after.position).length() < 1e-3);
            prop_assert!(approx(server.heading, after.heading));
        }
    }
}
