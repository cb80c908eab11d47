use glam::Vec2;

use crate::config::GameConfig;
use crate::world::{EntityKind, EntityTag, InputSample, State};

/// Player avatar. Input is `[x, y, turn]`: a planar direction in world
/// axes, each component in `-1..=1`, and a heading change in radians.
#[derive(Debug, Default)]
pub struct Walker;

impl Walker {
    pub const TAG: EntityTag = 1;

    /// Distance covered per tick at full input.
    pub fn step_length(config: &GameConfig) -> f32 {
        config.max_player_speed / config.tick_rate as f32
    }
}

impl EntityKind for Walker {
    fn name(&self) -> &'static str {
        "walker"
    }

    fn apply_input(&self, velocity: &mut State, input: &InputSample, config: &GameConfig) {
        let direction = Vec2::new(input.value(0), input.value(1));
        let direction = if direction.is_finite() {
            direction.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        let step = direction * Self::step_length(config);

        velocity.position.x = step.x;
        velocity.position.y = step.y;
        velocity.heading = if input.value(2).is_finite() {
            input.value(2)
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn velocity(values: Vec<f32>) -> State {
        let mut velocity = State::ZERO;
        Walker.apply_input(&mut velocity, &InputSample::new(0, values), &GameConfig::default());
        velocity
    }

    #[test]
    fn full_input_moves_one_step() {
        let config = GameConfig::default();
        let v = velocity(vec![1.0, 0.0, 0.0]);
        assert!((v.position.x - Walker::step_length(&config)).abs() < 1e-6);
        assert_eq!(v.position.y, 0.0);
    }

    #[test]
    fn diagonal_is_not_faster() {
        let config = GameConfig::default();
        let v = velocity(vec![1.0, 1.0, 0.0]);
        let length = v.position.truncate().length();
        assert!((length - Walker::step_length(&config)).abs() < 1e-5);
    }

    #[test]
    fn missing_or_broken_values_do_nothing() {
        assert_eq!(velocity(vec![]), State::ZERO);
        assert_eq!(velocity(vec![f32::NAN, 0.0, f32::INFINITY]), State::ZERO);
    }

    #[test]
    fn turn_passes_through() {
        assert_eq!(velocity(vec![0.0, 0.0, 0.25]).heading, 0.25);
    }
}
