use clap::ValueEnum;
use glam::Vec2;

use ticksync::{Entity, InputSource, Tick};

/// Scripted movement for headless clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Stand still.
    Idle,
    /// Walk forward while turning.
    Circle,
    /// Walk east and west.
    Strafe,
}

pub struct Bot {
    pattern: Pattern,
    ticks: u32,
}

impl Bot {
    const TURN_PER_TICK: f32 = 0.05;
    const STRAFE_TICKS: u32 = 60;

    pub fn new(pattern: Pattern) -> Self {
        Self { pattern, ticks: 0 }
    }
}

impl InputSource for Bot {
    fn sample(&mut self, entity: &Entity, _tick: Tick) -> Option<Vec<f32>> {
        let elapsed = self.ticks;
        self.ticks = self.ticks.wrapping_add(1);
        match self.pattern {
            Pattern::Idle => None,
            Pattern::Circle => {
                let forward = Vec2::from_angle(entity.state().heading);
                Some(vec![forward.x, forward.y, Self::TURN_PER_TICK])
            }
            Pattern::Strafe => {
                let east = (elapsed / Self::STRAFE_TICKS) % 2 == 0;
                Some(vec![if east { 1.0 } else { -1.0 }, 0.0, 0.0])
            }
        }
    }
}
