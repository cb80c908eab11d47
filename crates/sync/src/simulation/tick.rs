use std::time::{Duration, Instant};

use crate::net::Tick;

/// Below this much remaining time the scheduler spins instead of sleeping.
pub const SPIN_THRESHOLD: Duration = Duration::from_millis(3);

/// The wrapped wire tick plus the unbounded tick it was derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickClock {
    full: u64,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the clock at a tick announced by the server.
    pub fn starting_at(tick: Tick) -> Self {
        Self { full: tick as u64 }
    }

    pub fn advance(&mut self) {
        self.full += 1;
    }

    pub fn reset(&mut self) {
        self.full = 0;
    }

    pub fn wrapped(&self) -> Tick {
        self.full as Tick
    }

    pub fn full(&self) -> u64 {
        self.full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run one simulation step now.
    Tick,
    /// Close to the deadline; yield and poll again.
    Spin,
    /// Far from the deadline; sleep this long and poll again.
    Sleep(Duration),
}

/// Fixed-rate step pacing. The next deadline is taken from the moment a
/// step is granted, so slow steps push the schedule back instead of
/// piling up catch-up steps.
#[derive(Debug)]
pub struct TickScheduler {
    per_tick: Duration,
    deadline: Option<Instant>,
}

impl TickScheduler {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            per_tick: Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64),
            deadline: None,
        }
    }

    pub fn per_tick(&self) -> Duration {
        self.per_tick
    }

    pub fn poll(&mut self, now: Instant) -> Schedule {
        let deadline = *self.deadline.get_or_insert(now + self.per_tick);
        let remaining = deadline.saturating_duration_since(now);

        if remaining.is_zero() {
            self.deadline = Some(now + self.per_tick);
            Schedule::Tick
        } else if remaining > SPIN_THRESHOLD {
            Schedule::Sleep(remaining - SPIN_THRESHOLD)
        } else {
            Schedule::Spin
        }
    }
}
