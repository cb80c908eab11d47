mod context;
mod level;
mod tick;

pub use context::{Role, SimulationContext};
pub use level::{Level, OpenLevel};
pub use tick::{SPIN_THRESHOLD, Schedule, TickClock, TickScheduler};
